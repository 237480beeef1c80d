//! `bravomind check`: Run the safety pipeline on a message without a generator.

use bravomind_config::AppConfig;
use bravomind_safety::SafetyPipeline;

pub async fn run(message: String, candidate: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let pipeline = SafetyPipeline::from_config(&config)?;

    let scope = pipeline.explain_scope(&message);
    let result = pipeline.process_message_opt(Some(&message), candidate.as_deref());

    let report = serde_json::json!({
        "scope": scope,
        "validation": pipeline.check_candidate(candidate.as_deref().unwrap_or_default()),
        "guidance": result.crisis_severity.guidance(),
        "result": result,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
