//! Convert command: fragment file to the output profile format.

use super::utils::{emit_json, load_fragment};
use crate::frame::all_application;
use crate::output::fragment_output;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the convert command
#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    pub input: PathBuf,

    /// Output path; stdout when unset
    pub output: Option<PathBuf>,
}

/// Execute the convert command
pub fn execute_convert(args: ConvertArgs) -> Result<()> {
    let fragment = load_fragment(&args.input)?;
    let output = fragment_output(&fragment, &all_application)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    info!(
        "Converted {} into {} profiles with {} frames",
        fragment.id(),
        output.profiles.len(),
        output.shared.frames.len()
    );
    emit_json(&output, args.output.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::read_output;

    #[test]
    fn test_convert_event_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fragment.json");
        std::fs::write(
            &input,
            r#"{"chunk_id":"c","duration_ns":100,"profile":{
                "clock":"Wall",
                "events":[
                    {"action":"Enter","thread_id":1,"method_id":1,"time":{"Monotonic":{"wall":{"secs":0,"nanos":10}}}},
                    {"action":"Exit","thread_id":1,"method_id":1,"time":{"Monotonic":{"wall":{"secs":0,"nanos":50}}}}
                ],
                "methods":[{"class_name":"com.example.Main","id":1,"name":"run"}],
                "threads":[{"id":1,"name":"main"}]
            }}"#,
        )
        .unwrap();
        let output_path = dir.path().join("out/output.json");

        execute_convert(ConvertArgs {
            input,
            output: Some(output_path.clone()),
        })
        .unwrap();

        let output = read_output(output_path).unwrap();
        assert_eq!(output.duration_ns, 100);
        assert_eq!(output.shared.frames[0].name, "com.example.Main.run");
    }
}
