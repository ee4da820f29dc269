//! Prompt strategy selection
//!
//! Maps a task to its system/user prompt pair. Pure: no I/O, and the same
//! task always yields the same pair.

use crate::request::{
  AnalysisParams, AnalysisType, DraftingParams, PromptPair,
  ResearchParams, TaskParams, TaskRequest,
};

const RESEARCH_SYSTEM: &str = "You are an expert legal research assistant. \
Answer legal questions using the IRAC structure:
- Issue: state the precise legal question presented
- Rule: identify the governing statutes, regulations and case law
- Application: apply the rules to the facts of the question
- Conclusion: give a clear, reasoned conclusion

Cite authorities accurately, note where the law is unsettled or varies by \
jurisdiction, and state that the analysis is not a substitute for advice \
from a licensed attorney.";

const ANALYST: &str = "You are an expert legal document analyst.";

/// Build the prompt pair for a task
pub fn select(request: &TaskRequest) -> PromptPair
{   match &request.params
    {   TaskParams::Research(p) => research(p)
      , TaskParams::DocumentAnalysis(p) => analysis(p)
      , TaskParams::Drafting(p) => drafting(p)
    }
}

fn research(p: &ResearchParams) -> PromptPair
{   let user_prompt = format!(
      "Research question: {}\n\n\
       Jurisdiction: {}\n\
       Practice area: {}\n\
       Citation style: {}\n\
       Output format: {}\n\n\
       Focus on authority from the stated jurisdiction, format every \
       citation in the stated citation style, and present the answer in \
       the stated output format.",
      p.query, p.jurisdiction, p.practice_area, p.citation_style, p.format
    );
    PromptPair
    {   system_prompt: RESEARCH_SYSTEM.to_string()
      , user_prompt
    }
}

fn analysis(p: &AnalysisParams) -> PromptPair
{   let (system_prompt, instruction) = match p.analysis_type
    {   AnalysisType::Summarize => (
          format!("{} Provide a clear, concise summary of legal documents \
            that highlights key points, parties involved, main obligations, \
            and critical dates or deadlines.", ANALYST)
        , "Please summarize this legal document"
        )
      , AnalysisType::Clauses => (
          format!("{} Extract and identify key clauses from legal documents, \
            explaining their significance and potential impact.", ANALYST)
        , "Please extract and analyze the key clauses from this legal document"
        )
      , AnalysisType::Risk => (
          "You are an expert legal risk analyst. Identify potential risks, \
            liabilities, and concerns in legal documents. Categorize risks by \
            severity (high, medium, low) and provide recommendations."
            .to_string()
        , "Please conduct a risk analysis of this legal document"
        )
      , AnalysisType::Compare => (
          format!("{} Compare multiple documents to identify differences, \
            similarities, and potential conflicts or inconsistencies.", ANALYST)
        , "Please analyze and compare this legal document"
        )
        // unrecognised sub-modes get the comprehensive analysis persona
      , AnalysisType::Other(_) => (
          format!("{} Provide comprehensive analysis of legal documents.", ANALYST)
        , "Please analyze this legal document"
        )
    };
    PromptPair
    {   system_prompt
      , user_prompt: format!("{}:\n\n{}", instruction, p.document_text)
    }
}

fn drafting(p: &DraftingParams) -> PromptPair
{   let system_prompt = format!(
"You are an expert legal document drafter. Generate professional, legally sound documents based on the user's requirements.

Template Type: {}
Writing Style: {}
Document Length: {}
Jurisdiction: {}

Instructions:
- Use proper legal formatting and structure
- Include all necessary clauses and provisions
- Use appropriate legal terminology
- Format with clear sections and numbering
- Include placeholder text in [brackets] where specific information should be inserted
- Ensure the document is comprehensive and professionally written",
      p.template, p.style, p.length, p.jurisdiction
    );
    PromptPair
    {   system_prompt
      , user_prompt: p.prompt.clone()
    }
}
