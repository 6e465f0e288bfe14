/*!

Retrieves the artifacts a test run leaves in its output directory. JUnit XML
files at the top level are the results proper; everything else (including the
`containerLogs` directory) rides along as diagnostic logs.

!*/

use snafu::{ensure, ResultExt, Snafu};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Snafu)]
pub enum ResultsError {
    #[snafu(display(
        "No XML results were found in '{}'. The test may have exited abruptly without producing \
         output. Check the collected logs for errors.",
        dir.display()
    ))]
    NoXmlResults { dir: PathBuf },

    #[snafu(display("Unable to read directory '{}': {}", dir.display(), source))]
    ReadDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to read file '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

type Result<T> = std::result::Result<T, ResultsError>;

/// The artifacts retrieved from one run, keyed by path relative to the output directory.
#[derive(Debug, Default)]
pub struct ResultSet {
    /// JUnit XML result files found at the top level of the output directory.
    pub xml: BTreeMap<String, Vec<u8>>,
    /// Everything else, collected for diagnosis even when the run succeeded.
    pub logs: BTreeMap<String, Vec<u8>>,
}

/// Scans `output_dir` and returns the run's artifacts. Finding zero XML files is an error even
/// when log files are present and the job exited zero, because the absence of results more likely
/// means an aborted run than a genuinely empty suite.
pub fn retrieve<P>(output_dir: P) -> Result<ResultSet>
where
    P: AsRef<Path>,
{
    let output_dir = output_dir.as_ref();
    let mut results = ResultSet::default();
    collect(output_dir, Path::new(""), &mut results)?;
    ensure!(
        !results.xml.is_empty(),
        NoXmlResultsSnafu { dir: output_dir }
    );
    Ok(results)
}

fn collect(dir: &Path, relative: &Path, results: &mut ResultSet) -> Result<()> {
    let entries = fs::read_dir(dir).context(ReadDirSnafu { dir })?;
    for entry in entries {
        let entry = entry.context(ReadDirSnafu { dir })?;
        let path = entry.path();
        let relative_path = relative.join(entry.file_name());
        if path.is_dir() {
            collect(&path, &relative_path, results)?;
            continue;
        }
        let contents = fs::read(&path).context(ReadFileSnafu { path: &path })?;
        let name = relative_path.to_string_lossy().into_owned();
        let is_top_level_xml = relative.as_os_str().is_empty()
            && path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("xml"))
                .unwrap_or_default();
        if is_top_level_xml {
            results.xml.insert(name, contents);
        } else {
            results.logs.insert(name, contents);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn logs_without_xml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("containerLogs");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("pod-test-harness.log"), b"log output").unwrap();

        let result = retrieve(dir.path());
        assert!(matches!(result, Err(ResultsError::NoXmlResults { .. })));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = retrieve(dir.path());
        assert!(matches!(result, Err(ResultsError::NoXmlResults { .. })));
    }

    #[test]
    fn xml_and_logs_are_both_collected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("junit_conformance.xml"), b"<testsuite/>").unwrap();
        let logs = dir.path().join("containerLogs");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("pod-test-harness.log"), b"harness log").unwrap();
        fs::write(logs.join("pod-push-results.log"), b"push log").unwrap();

        let results = retrieve(dir.path()).unwrap();
        assert_eq!(results.xml.len(), 1);
        assert_eq!(
            results.xml.get("junit_conformance.xml").unwrap(),
            b"<testsuite/>"
        );
        assert_eq!(results.logs.len(), 2);
        assert!(results
            .logs
            .contains_key("containerLogs/pod-test-harness.log"));
        assert!(results
            .logs
            .contains_key("containerLogs/pod-push-results.log"));
    }

    #[test]
    fn nested_xml_is_treated_as_a_log() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("junit.xml"), b"<testsuite/>").unwrap();
        let nested = dir.path().join("extra");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("detail.xml"), b"<detail/>").unwrap();

        let results = retrieve(dir.path()).unwrap();
        assert_eq!(results.xml.len(), 1);
        assert!(results.logs.contains_key("extra/detail.xml"));
    }
}
