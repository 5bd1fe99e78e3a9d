use serde::{Serialize, Serializer};

/// Statistics of one sensor, in the shape they are printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReport {
    pub id: String,
    #[serde(serialize_with = "as_text")]
    pub average: f64,
    #[serde(serialize_with = "as_text")]
    pub median: f64,
    pub mode: Vec<f64>,
}

// Average and median are quoted in the output ("average":"23.5"); existing
// consumers of the report read them as strings.
fn as_text<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Renders the reports as a JSON array, one sensor object per line.
pub fn format_results(results: &[SensorReport]) -> serde_json::Result<String> {
    let results = results
        .iter()
        .map(serde_json::to_string)
        .collect::<serde_json::Result<Vec<String>>>()?;
    Ok(format!("[{}]", results.join(",\n")))
}
