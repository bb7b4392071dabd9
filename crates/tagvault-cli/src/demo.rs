//! Scripted walk through the tag lifecycle on a simulated tag.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use tagvault_hardware::TagBackend;
use tagvault_security::AnyTagBackend;
use tagvault_simulator::EMPTY_TAG;

const PASSWORD: &str = "demo-pass";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StepReport {
    step: &'static str,
    expect_success: bool,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StepReport {
    fn new<T: Serialize>(
        step: &'static str,
        expect_success: bool,
        result: tagvault_core::Result<T>,
    ) -> Self {
        let result = result.and_then(|data| Ok(serde_json::to_value(data)?));
        Self {
            step,
            expect_success,
            success: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            result: result.ok().filter(|value| !value.is_null()),
        }
    }

    fn as_expected(&self) -> bool {
        self.success == self.expect_success
    }
}

/// Run the scripted scenario on the simulator's empty tag.
///
/// Returns whether every step behaved as expected.
pub async fn run(backend: &AnyTagBackend, json: bool) -> Result<bool> {
    let simulator = backend
        .simulator()
        .context("the demo needs simulated tags")?;
    simulator.reset_tags();
    simulator.select_tag(EMPTY_TAG)?;

    let record = json!({"deviceId": "DEMO-0001", "name": "Demo sensor", "type": "sensor"});

    let steps = vec![
        StepReport::new("write device record", true, backend.write_tag(&record).await),
        StepReport::new("lock with password", true, backend.lock_tag(PASSWORD).await),
        StepReport::new("check lock status", true, backend.is_tag_locked().await),
        StepReport::new(
            "write while locked",
            false,
            backend.write_tag(&json!({"deviceId": "INTRUDER"})).await,
        ),
        StepReport::new("unlock with wrong password", false, backend.unlock_tag("nope-nope").await),
        StepReport::new("unlock", true, backend.unlock_tag(PASSWORD).await),
        StepReport::new("read back", true, backend.read_tag().await),
    ];

    simulator.reset_tags();

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
    } else {
        for (index, step) in steps.iter().enumerate() {
            let mark = if step.as_expected() { "ok" } else { "UNEXPECTED" };
            let detail = match (&step.result, &step.error) {
                (_, Some(error)) => format!(" ({error})"),
                (Some(result), None) => format!(" {result}"),
                (None, None) => String::new(),
            };
            println!("[{}] {:<28} {mark}{detail}", index + 1, step.step);
        }
    }

    Ok(steps.iter().all(StepReport::as_expected))
}
