use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use vakt_logger::escalate::{Emailer, EscalationError};
use vakt_logger::{Dispatch, Settings, Severity};

struct NoopEmailer;

impl Emailer for NoopEmailer {
    fn prepare_fresh_envelope(&mut self) -> Result<(), EscalationError> {
        Ok(())
    }

    fn send(
        &mut self,
        _subject: &str,
        _body: &str,
        _recipients: &[String],
        _attachments: &[PathBuf],
    ) -> Result<(), EscalationError> {
        Ok(())
    }
}

#[test]
fn test_settings_file_builds_working_logger() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("vakt.toml");
    let root = dir.path().join("logs");
    fs::write(
        &config_path,
        format!(
            "project_name = \"cfg-demo\"\nroot_location = \"{}\"\nrotation = \"daily\"\n",
            root.display()
        ),
    )
    .unwrap();

    let settings = Settings::from_file(&config_path).unwrap();
    let mut logger = settings.builder().build().unwrap();

    assert_eq!(logger.project(), "cfg-demo");
    assert_eq!(logger.spec().name, "daily");

    logger.log(Severity::Info, "configured from file");
    logger.flush();

    let content = fs::read_to_string(root.join("cfg-demo").join("info.daily.log")).unwrap();
    assert!(content.contains("configured from file"));
}

#[test]
fn test_rotation_table_overrides_apply() {
    let dir = TempDir::new().unwrap();
    let raw = format!(
        "project_name = \"cfg-demo\"\nroot_location = \"{}\"\nseverities = [\"error\"]\n\n[rotation]\nname = \"hourly\"\ninterval = 6\nbackup_count = 4\n",
        dir.path().join("logs").display()
    );

    let settings = Settings::from_toml(&raw).unwrap();
    let logger = settings.builder().build().unwrap();

    let spec = logger.spec();
    assert_eq!(spec.name, "hourly");
    assert_eq!(spec.interval, 6);
    assert_eq!(spec.backup_count, 4);
    assert_eq!(logger.descriptors().len(), 1);
    assert_eq!(logger.descriptors()[0].severity, Severity::Error);
}

#[test]
fn test_email_section_enables_capability() {
    let dir = TempDir::new().unwrap();
    let raw = format!(
        "project_name = \"cfg-demo\"\nroot_location = \"{}\"\nseverities = []\n\n[email]\nsubject = \"cfg alerts\"\nrecipients = [\"ops@example.com\", \"dev@example.com\"]\n",
        dir.path().join("logs").display()
    );

    let settings = Settings::from_toml(&raw).unwrap();
    let email = settings.email.clone().unwrap();
    assert_eq!(email.recipients.len(), 2);

    let logger = settings
        .builder()
        .email(email, Box::new(NoopEmailer))
        .build()
        .unwrap();
    assert!(logger.has_email_capability());
}

#[test]
fn test_invalid_settings_are_rejected_with_cause() {
    let no_name = Settings::from_toml("project_name = \"demo\"\n[rotation]\ninterval = 2");
    assert!(
        no_name
            .unwrap_err()
            .to_string()
            .contains("missing the 'name' key")
    );

    let unknown = Settings::from_toml("project_name = \"demo\"\nrotation = \"weekly\"");
    assert!(
        unknown
            .unwrap_err()
            .to_string()
            .contains("unknown rotation preset 'weekly'")
    );
}
