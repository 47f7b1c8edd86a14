//! Workflow-level tests: drive a run from a plan file through `ship`.

use std::fs;
use std::process::Command;

use agentic::core::phase::Phase;
use agentic::exit_codes;
use agentic::io::config::{HarnessConfig, write_config};
use agentic::io::prompt::PromptEngine;
use agentic::io::store;
use agentic::phases::{PhaseContext, run_phase};
use agentic::test_support::{ScriptedProvider, ScriptedShipper, ScriptedTestRunner};
use agentic::workflow::{WorkflowStop, run_workflow};

const CLASSIFY: &str = r#"{"task_type": "feature", "reason": "new chart type"}"#;
const PLAN: &str = "Here is the plan:\n```json\n{\"plan\": \"1. scatter with matplotlib\"}\n```";
const GENERATE: &str = r#"Done. {"code": "import matplotlib\nprint(\"```json\")"} Let me know."#;
const SHIP: &str = r#"{"commit_message": "feat(matplotlib): add scatter-basic"}"#;

fn spec_file(dir: &std::path::Path) -> String {
    let path = dir.join("spec.md");
    fs::write(&path, "# scatter-basic\n\nA basic scatter plot.\n").expect("write spec");
    path.display().to_string()
}

/// Full lifecycle: plan file → classify → plan → generate → test → ship, with
/// every phase saved and the record reloadable between phases.
#[test]
fn plan_file_run_ships() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store_dir = temp.path().join("runs");
    let provider = ScriptedProvider::new([CLASSIFY, PLAN, GENERATE, SHIP]);
    let tester = ScriptedTestRunner::passing();
    let shipper = ScriptedShipper::new(Some("https://example.com/pr/42"));
    let prompts = PromptEngine::new().expect("templates");
    let ctx = PhaseContext {
        store_dir: &store_dir,
        provider: &provider,
        tester: &tester,
        shipper: &shipper,
        prompts: &prompts,
        script_name: "plot.py",
    };

    let spec = spec_file(temp.path());
    let mut run = store::create("(from plan file)", Some(spec.as_str()));
    let mut seen = Vec::new();
    let outcome = run_workflow(&mut run, &ctx, None, |phase, run| {
        let saved = store::load(run.run_id(), &store_dir).expect("reload");
        assert_eq!(saved.phase(), Some(phase));
        seen.push(phase);
    })
    .expect("workflow");

    assert_eq!(outcome.stop, WorkflowStop::Shipped);
    assert_eq!(outcome.phases_executed, Phase::ALL.to_vec());
    assert_eq!(seen, Phase::ALL.to_vec());
    assert_eq!(run.task_type(), Some("feature"));
    assert_eq!(run.plan(), Some("1. scatter with matplotlib"));
    assert_eq!(run.code(), Some("import matplotlib\nprint(\"```json\")"));
    assert_eq!(run.pr_url(), Some("https://example.com/pr/42"));
    assert_eq!(
        shipper.messages(),
        vec!["feat(matplotlib): add scatter-basic".to_string()]
    );
    assert_eq!(provider.remaining(), 0);

    let saved = store::load(run.run_id(), &store_dir).expect("load");
    assert_eq!(saved, run);
    assert!(saved.get("created_at").is_some());
}

/// A failing test stops the workflow at `test`; regenerating feeds the
/// diagnostic back and a rerun resumes from the saved phase.
#[test]
fn failing_test_stops_then_resumes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store_dir = temp.path().join("runs");
    let prompts = PromptEngine::new().expect("templates");
    let shipper = ScriptedShipper::new(None);

    let provider = ScriptedProvider::new([CLASSIFY, PLAN, GENERATE]);
    let failing = ScriptedTestRunner::failing("ModuleNotFoundError: matplotlib");
    let ctx = PhaseContext {
        store_dir: &store_dir,
        provider: &provider,
        tester: &failing,
        shipper: &shipper,
        prompts: &prompts,
        script_name: "plot.py",
    };
    let mut run = store::create("Add a scatter plot", None);
    let outcome = run_workflow(&mut run, &ctx, None, |_, _| {}).expect("workflow");
    assert_eq!(outcome.stop, WorkflowStop::TestsFailed);
    assert_eq!(run.phase(), Some(Phase::Test));
    assert!(shipper.messages().is_empty());

    let run_id = run.run_id().to_string();
    let mut resumed = store::load(&run_id, &store_dir).expect("load");
    let provider = ScriptedProvider::new([GENERATE, SHIP]);
    let passing = ScriptedTestRunner::passing();
    let ctx = PhaseContext {
        tester: &passing,
        provider: &provider,
        ..ctx
    };
    let outcome =
        run_workflow(&mut resumed, &ctx, Some(Phase::Generate), |_, _| {}).expect("workflow");

    assert_eq!(outcome.stop, WorkflowStop::Shipped);
    assert_eq!(
        outcome.phases_executed,
        vec![Phase::Generate, Phase::Test, Phase::Ship]
    );
    assert!(provider.prompts()[0].contains("ModuleNotFoundError: matplotlib"));
    assert_eq!(resumed.pr_url(), None);
    assert_eq!(
        resumed.commit_message(),
        Some("feat(matplotlib): add scatter-basic")
    );
}

#[test]
fn phases_run_individually_after_reload() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store_dir = temp.path().join("runs");
    let prompts = PromptEngine::new().expect("templates");
    let provider = ScriptedProvider::new([CLASSIFY, PLAN]);
    let tester = ScriptedTestRunner::passing();
    let shipper = ScriptedShipper::new(None);
    let ctx = PhaseContext {
        store_dir: &store_dir,
        provider: &provider,
        tester: &tester,
        shipper: &shipper,
        prompts: &prompts,
        script_name: "plot.py",
    };

    let mut run = store::create("Add a scatter plot", None);
    run_phase(Phase::Classify, &mut run, &ctx).expect("classify");

    let mut reloaded = store::load(run.run_id(), &store_dir).expect("load");
    run_phase(Phase::Plan, &mut reloaded, &ctx).expect("plan");
    assert!(provider.prompts()[1].contains("Task type: `feature`"));

    let saved = store::load(run.run_id(), &store_dir).expect("load");
    assert_eq!(saved.phase(), Some(Phase::Plan));
    assert_eq!(saved.classify_reason(), Some("new chart type"));
    assert_eq!(saved.plan(), Some("1. scatter with matplotlib"));
}

/// End-to-end through the binary with shell stand-ins for the model, the
/// test command and the publish command.
#[test]
fn cli_run_drives_plan_file_to_ship() {
    let temp = tempfile::tempdir().expect("tempdir");
    let fake_llm = r##"read -r header
cat > /dev/null
case "$header" in
  "# Classify") echo '{"task_type": "feature", "reason": "new plot"}' ;;
  "# Plan") printf '%s\n' 'Plan:' '```json' '{"plan": "1. echo"}' '```' ;;
  "# Generate") echo 'Sure: {"code": "echo rendered plot.png"}' ;;
  "# Ship") echo '{"commit_message": "feat: add scatter-basic"}' ;;
  *) exit 9 ;;
esac"##;
    let mut cfg = HarnessConfig::default();
    cfg.llm.command = vec!["sh".to_string(), "-c".to_string(), fake_llm.to_string()];
    cfg.test.command = vec!["sh".to_string(), "{file}".to_string()];
    cfg.test.file_name = "plot.sh".to_string();
    cfg.ship.command = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo pushing {run_id}; echo https://example.com/pr/{run_id}".to_string(),
    ];
    write_config(&temp.path().join("agentic.toml"), &cfg).expect("write config");
    spec_file(temp.path());

    let output = Command::new(env!("CARGO_BIN_EXE_agentic"))
        .current_dir(temp.path())
        .args(["--store", "runs", "run", "--plan-file", "spec.md"])
        .output()
        .expect("agentic run");

    assert_eq!(output.status.code(), Some(exit_codes::OK), "{output:?}");
    let printed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let run_id = printed["run_id"].as_str().expect("run id");
    assert_eq!(printed["phase"], "ship");
    assert_eq!(printed["plan"], "1. echo");
    assert_eq!(
        printed["pr_url"],
        format!("https://example.com/pr/{run_id}").as_str()
    );

    let run_dir = temp.path().join("runs").join(run_id);
    for phase in ["classify", "plan", "generate", "ship"] {
        assert!(run_dir.join(format!("{phase}.prompt.md")).exists(), "{phase}");
        assert!(run_dir.join(format!("{phase}.response.txt")).exists(), "{phase}");
    }
    let log = fs::read_to_string(run_dir.join("test.log")).expect("test log");
    assert!(log.contains("rendered plot.png"));
}
