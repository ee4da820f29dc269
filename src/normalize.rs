//! Packages gateway output for the caller

use std::collections::BTreeMap;

use crate::request::{GatewayResult, NormalizedResponse, TaskParams, TaskRequest};

pub const META_MODEL: &str = "model";
pub const META_KIND: &str = "kind";
pub const META_FILE_NAME: &str = "fileName";
pub const META_ANALYSIS_TYPE: &str = "analysisType";

/// Auxiliary fields carried alongside the generated text
pub fn metadata_for(request: &TaskRequest, model: &str)
  -> BTreeMap<String, String>
{   let mut metadata = BTreeMap::new();
    metadata.insert(META_MODEL.to_string(), model.to_string());
    let kind = match request.params
    {   TaskParams::Research(_) => "research"
      , TaskParams::DocumentAnalysis(_) => "document-analysis"
      , TaskParams::Drafting(_) => "drafting"
    };
    metadata.insert(META_KIND.to_string(), kind.to_string());
    if let TaskParams::DocumentAnalysis(p) = &request.params
    {   metadata.insert(
          META_ANALYSIS_TYPE.to_string()
        , p.analysis_type.as_str().to_string()
        );
        if let Some(name) = &p.file_name
        {   metadata.insert(META_FILE_NAME.to_string(), name.clone());
        }
    }
    metadata
}

/// Failures pass through unchanged; text is never altered
pub fn normalize(
  result: GatewayResult
, metadata: BTreeMap<String, String>
) -> Result<NormalizedResponse, crate::error::Error>
{   result.map(|content| NormalizedResponse
    {   content
      , metadata
    })
}
