use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use super::tally::Tally;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    version: u8,
    store: String,
    written: usize,
    sources: BTreeMap<String, usize>,
    categories: BTreeMap<String, usize>,
    uncategorized: usize,
    malformed_inputs: usize,
    meta: JsonMeta,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMeta {
    run_duration: u64,
    store_size: u64,
}

pub fn to_json(tally: &Tally, store: &Path) -> Result<String> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Elapsed time is never negative
    let run_duration = (tally.elapsed_secs() * 1000.0) as u64;

    let summary = JsonSummary {
        version: 1,
        store: store.to_string_lossy().to_string(),
        written: tally.written(),
        sources: tally.sources().into_iter().collect(),
        categories: tally.categories().into_iter().collect(),
        uncategorized: tally.uncategorized(),
        malformed_inputs: tally.malformed_inputs,
        meta: JsonMeta {
            run_duration,
            store_size: std::fs::metadata(store).map_or(0, |m| m.len()),
        },
    };

    Ok(serde_json::to_string_pretty(&summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_json_summary_shape() {
        let mut tally = Tally::new();
        tally.record("aad", Some("user".to_string()));
        tally.record("arm", None);
        tally.mark_complete();

        let out = to_json(&tally, &PathBuf::from("results.db")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["store"], "results.db");
        assert_eq!(json["written"], 2);
        assert_eq!(json["sources"]["aad"], 1);
        assert_eq!(json["sources"]["arm"], 1);
        assert_eq!(json["categories"]["user"], 1);
        assert_eq!(json["categories"].as_object().unwrap().len(), 1);
        assert_eq!(json["uncategorized"], 1);
        assert_eq!(json["malformedInputs"], 0);
        assert!(json["meta"]["runDuration"].is_u64());
    }
}
