/*!

Generates the shell scripts that run inside the cluster during a test run.

Two scripts exist. The collector script watches the job from a separate pod,
and once the job is no longer active it copies both containers' logs into the
shared output directory. The push script runs in the `push-results` sidecar of
the job itself, waits for the harness container to terminate, and then syncs
the output directory to the collector host with a bounded retry.

The scripts are rendered from fixed templates with named placeholders rather
than assembled by string concatenation. Parameter values are restricted to a
safe character set so that a caller-supplied job name or path cannot alter the
script's structure.

!*/

use snafu::{ensure, Snafu};

#[derive(Debug, Snafu)]
pub enum ScriptError {
    #[snafu(display(
        "Value '{}' for script parameter '{}' contains characters outside of [A-Za-z0-9._/-]",
        value,
        name
    ))]
    UnsafeParameter { name: String, value: String },

    #[snafu(display("Script template has no parameter named '{}'", name))]
    UnknownParameter { name: String },

    #[snafu(display("Script parameter '{}' was not filled", name))]
    UnfilledParameter { name: String },
}

type Result<T> = std::result::Result<T, ScriptError>;

/// A shell script template with `{{name}}` placeholders.
struct ScriptTemplate {
    text: &'static str,
}

impl ScriptTemplate {
    /// Substitutes each `(name, value)` pair for its `{{name}}` placeholder. Every parameter must
    /// appear in the template and every placeholder must be filled.
    fn render(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut rendered = self.text.to_string();
        for (name, value) in params {
            ensure!(
                is_safe_value(value),
                UnsafeParameterSnafu {
                    name: *name,
                    value: *value
                }
            );
            let placeholder = format!("{{{{{}}}}}", name);
            ensure!(
                rendered.contains(&placeholder),
                UnknownParameterSnafu { name: *name }
            );
            rendered = rendered.replace(&placeholder, value);
        }
        if let Some(start) = rendered.find("{{") {
            let rest = &rendered[start + 2..];
            let name = rest.split("}}").next().unwrap_or(rest);
            return UnfilledParameterSnafu { name }.fail();
        }
        Ok(rendered)
    }
}

/// A parameter value may only contain characters that are inert inside a double-quoted or bare
/// shell word. This permits resource names and absolute paths and nothing else.
fn is_safe_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

const COLLECTOR_TEMPLATE: ScriptTemplate = ScriptTemplate {
    text: r#"set +e

while oc get job/{{job_name}} -o=jsonpath='{.status}' | grep -q active; do sleep 1; done

mkdir -p "{{output_dir}}/containerLogs"
JOB_POD=$(oc get pods -l job-name={{job_name}} -o=jsonpath='{.items[0].metadata.name}')

if [[ ! $JOB_POD ]]; then
  echo "test harness pod not found, may have been terminated. exiting"

else
  echo "found test harness pod $JOB_POD"
  oc logs $JOB_POD -c test-harness > "{{output_dir}}/containerLogs/${JOB_POD}-test-harness.log"
  oc logs $JOB_POD -c push-results > "{{output_dir}}/containerLogs/${JOB_POD}-push-results.log"
fi"#,
};

const PUSH_TEMPLATE: ScriptTemplate = ScriptTemplate {
    text: r#"#!/usr/bin/env bash

JOB_POD=$(oc get pods -l job-name={{job_name}} -o=jsonpath='{.items[0].metadata.name}')
echo "Found Job Pod: $JOB_POD"
while ! oc get pod $JOB_POD -o jsonpath='{.status.containerStatuses[?(@.name=="test-harness")].state}' | grep -q terminated; do sleep 1; done
for i in {1..5}; do oc rsync -c push-results {{output_dir}}/. $(hostname):{{output_dir}} && break; sleep 10; done"#,
};

/// The script for the collector pod. It waits for the job to leave the active state and then makes
/// a best-effort copy of both containers' logs into `<output_dir>/containerLogs`. A missing pod
/// (for example an evicted one) is reported, not treated as a failure.
pub fn collector_script(job_name: &str, output_dir: &str) -> Result<String> {
    COLLECTOR_TEMPLATE.render(&[("job_name", job_name), ("output_dir", output_dir)])
}

/// The script for the `push-results` sidecar. It waits for the `test-harness` container to report
/// terminated status, then rsyncs the output directory to the collector host. The transfer is
/// attempted up to 5 times with a 10 second pause between attempts; the last attempt's exit status
/// propagates.
pub fn push_script(job_name: &str, output_dir: &str) -> Result<String> {
    PUSH_TEMPLATE.render(&[("job_name", job_name), ("output_dir", output_dir)])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn collector_fills_placeholders() {
        let script = collector_script("openshift-conformance", "/test-run-results").unwrap();
        assert!(script.contains("job/openshift-conformance"));
        assert!(script.contains("-l job-name=openshift-conformance"));
        assert!(script.contains("\"/test-run-results/containerLogs/${JOB_POD}-test-harness.log\""));
        assert!(script.contains("\"/test-run-results/containerLogs/${JOB_POD}-push-results.log\""));
        assert!(!script.contains("{{"));
    }

    #[test]
    fn collector_reports_missing_pod() {
        let script = collector_script("conformance", "/out").unwrap();
        assert!(script.contains("test harness pod not found"));
    }

    #[test]
    fn push_waits_for_harness_termination() {
        let script = push_script("conformance", "/out").unwrap();
        assert!(script.contains(r#"containerStatuses[?(@.name=="test-harness")].state"#));
        assert!(script.contains("grep -q terminated"));
    }

    #[test]
    fn push_retries_five_times_with_ten_second_backoff() {
        let script = push_script("conformance", "/out").unwrap();
        assert!(script.contains("for i in {1..5}"));
        assert!(script.contains("sleep 10"));
        assert!(script.contains("$(hostname):/out"));
    }

    #[test]
    fn unsafe_job_name_is_rejected() {
        for name in ["a b", "a;b", "a$(reboot)", "a'b", "a\"b", ""] {
            let result = push_script(name, "/out");
            assert!(
                matches!(result, Err(ScriptError::UnsafeParameter { .. })),
                "expected '{}' to be rejected",
                name
            );
        }
    }

    #[test]
    fn unsafe_output_dir_is_rejected() {
        let result = collector_script("conformance", "/out; rm -rf /");
        assert!(matches!(result, Err(ScriptError::UnsafeParameter { .. })));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let template = ScriptTemplate {
            text: "echo {{greeting}}",
        };
        let result = template.render(&[("greeting", "hello"), ("other", "x")]);
        assert!(matches!(result, Err(ScriptError::UnknownParameter { .. })));
    }

    #[test]
    fn unfilled_placeholder_is_rejected() {
        let template = ScriptTemplate {
            text: "echo {{greeting}} {{name}}",
        };
        let result = template.render(&[("greeting", "hello")]);
        match result {
            Err(ScriptError::UnfilledParameter { name }) => assert_eq!(name, "name"),
            other => panic!("expected UnfilledParameter, got {:?}", other),
        }
    }
}
