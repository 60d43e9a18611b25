//! End-to-end parsing of on-disk profile trees: locate, check, merge,
//! validate.

use std::fs;
use std::path::PathBuf;

use kmp_profile::{
    bootstrap_profile, parse_profile, ProfileError, ProfileParser, ProfileRule,
    PROFILE_MANIFEST_FILENAME,
};
use tempfile::TempDir;

/// Write `files` (relative path, contents) into a fresh directory.
fn profile_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    dir
}

fn manifest(body: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<profile format="1">
  <name>talker</name>
  <export><policy_type>keymint_ros</policy_type></export>
{body}
</profile>"#
    )
}

fn manifest_path(dir: &TempDir) -> PathBuf {
    dir.path().join(PROFILE_MANIFEST_FILENAME)
}

fn policy_names(policies: &[kmp_core::Element]) -> Vec<&str> {
    policies.iter().filter_map(|p| p.get("name")).collect()
}

const P1: &str = r#"<policies>
  <policy name="p1a"><default>ALLOW</default></policy>
  <policy name="p1b"/>
</policies>"#;

const P2: &str = r#"<policies><policy name="p2"/></policies>"#;

// =========================================================================
// Aggregation
// =========================================================================

#[test]
fn policies_are_merged_in_reference_order() {
    let body = r#"  <policies>
    <policy><policy_path>p1.xml</policy_path></policy>
    <policy><policy_path>p2.xml</policy_path></policy>
  </policies>"#;
    let dir = profile_tree(&[
        (PROFILE_MANIFEST_FILENAME, manifest(body).as_str()),
        ("p1.xml", P1),
        ("p2.xml", P2),
    ]);
    let profile = parse_profile(dir.path()).unwrap();
    let policies = profile.policies.as_deref().unwrap();
    assert_eq!(policy_names(policies), vec!["p1a", "p1b", "p2"]);
    assert_eq!(profile.authorities, None);
    assert_eq!(profile.filename, Some(manifest_path(&dir)));
}

#[test]
fn manifest_file_path_is_accepted_directly() {
    let dir = profile_tree(&[(PROFILE_MANIFEST_FILENAME, manifest("").as_str())]);
    let profile = parse_profile(manifest_path(&dir)).unwrap();
    assert_eq!(profile.name.as_deref(), Some("talker"));
}

#[test]
fn fragments_resolve_against_manifest_directory() {
    let body = r#"  <policies><policy><policy_path>sub/p2.xml</policy_path></policy></policies>"#;
    let dir = profile_tree(&[
        ("custom/profile.xml", manifest(body).as_str()),
        ("custom/sub/p2.xml", P2),
    ]);
    let profile = parse_profile(dir.path().join("custom/profile.xml")).unwrap();
    assert_eq!(profile.policy_count(), 1);
}

#[test]
fn authorities_are_merged() {
    let body = r#"  <authorities>
    <authority><authority_path>ca.xml</authority_path></authority>
  </authorities>"#;
    let dir = profile_tree(&[
        (PROFILE_MANIFEST_FILENAME, manifest(body).as_str()),
        (
            "ca.xml",
            r#"<authorities><authority name="identity_ca"/><authority name="permissions_ca"/></authorities>"#,
        ),
    ]);
    let profile = parse_profile(dir.path()).unwrap();
    assert_eq!(profile.authority_count(), 2);
    assert_eq!(profile.policies, None);
}

// =========================================================================
// Defaults overlay
// =========================================================================

#[test]
fn defaults_fill_gaps_without_overriding() {
    let body = r#"  <policies>
    <policy><policy_path>p1.xml</policy_path><defaults_path>d.xml</defaults_path></policy>
  </policies>"#;
    let dir = profile_tree(&[
        (PROFILE_MANIFEST_FILENAME, manifest(body).as_str()),
        ("p1.xml", P1),
        (
            "d.xml",
            r#"<policies><policy><default>DENY</default><description>inherited</description></policy></policies>"#,
        ),
    ]);
    let profile = parse_profile(dir.path()).unwrap();
    let policies = profile.policies.unwrap();
    assert_eq!(policies.len(), 2);

    assert_eq!(policies[0].find_text("default"), Some("ALLOW"));
    assert_eq!(policies[1].find_text("default"), Some("DENY"));
    for policy in &policies {
        assert_eq!(policy.find_text("description"), Some("inherited"));
    }
}

#[test]
fn defaults_leave_the_files_on_disk_untouched() {
    let body = r#"  <policies>
    <policy><policy_path>p1.xml</policy_path><defaults_path>d.xml</defaults_path></policy>
  </policies>"#;
    let defaults = r#"<policies><policy><default>DENY</default></policy></policies>"#;
    let dir = profile_tree(&[
        (PROFILE_MANIFEST_FILENAME, manifest(body).as_str()),
        ("p1.xml", P1),
        ("d.xml", defaults),
    ]);
    parse_profile(dir.path()).unwrap();
    assert_eq!(fs::read_to_string(dir.path().join("p1.xml")).unwrap(), P1);
    assert_eq!(fs::read_to_string(dir.path().join("d.xml")).unwrap(), defaults);
}

#[test]
fn defaults_template_adds_no_policy_to_an_empty_fragment() {
    let body = r#"  <policies>
    <policy><policy_path>empty.xml</policy_path><defaults_path>d.xml</defaults_path></policy>
  </policies>"#;
    let dir = profile_tree(&[
        (PROFILE_MANIFEST_FILENAME, manifest(body).as_str()),
        ("empty.xml", "<policies/>"),
        (
            "d.xml",
            r#"<policies><policy name="tmpl"><default>DENY</default></policy></policies>"#,
        ),
    ]);
    let profile = parse_profile(dir.path()).unwrap();
    assert_eq!(profile.policy_count(), 0);
}

#[test]
fn missing_defaults_file_is_path_error() {
    let body = r#"  <policies>
    <policy><policy_path>p1.xml</policy_path><defaults_path>gone.xml</defaults_path></policy>
  </policies>"#;
    let dir = profile_tree(&[(PROFILE_MANIFEST_FILENAME, manifest(body).as_str()), ("p1.xml", P1)]);
    let err = parse_profile(dir.path()).unwrap_err();
    match err {
        ProfileError::FragmentNotFound { path } => assert!(path.ends_with("gone.xml")),
        other => panic!("unexpected error: {other}"),
    }
}

// =========================================================================
// Errors and wrapping
// =========================================================================

#[test]
fn invalid_fragment_is_wrapped_once_with_manifest_path() {
    let body = r#"  <policies><policy><policy_path>bad.xml</policy_path></policy></policies>"#;
    let dir = profile_tree(&[
        (PROFILE_MANIFEST_FILENAME, manifest(body).as_str()),
        ("bad.xml", r#"<policies><policy/></policies>"#),
    ]);
    let err = parse_profile(dir.path()).unwrap_err();
    let message = err.to_string();
    let prefix = format!("Invalid profile manifest '{}': ", manifest_path(&dir).display());
    assert!(message.starts_with(&prefix), "{message}");
    assert_eq!(message.matches("Invalid profile manifest").count(), 1);
    assert!(message.contains("bad.xml' contains invalid XML"), "{message}");
    match err {
        ProfileError::InvalidManifest { source, .. } => {
            assert!(!matches!(*source, ProfileError::InvalidManifest { .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rule_violations_are_reported_together() {
    let xml = r#"<profile format="1">
  <name>Bad Name/</name>
  <version>1.2</version>
  <export><policy_type>keymint_ros</policy_type></export>
</profile>"#;
    let dir = profile_tree(&[(PROFILE_MANIFEST_FILENAME, xml)]);
    let err = parse_profile(dir.path()).unwrap_err();
    let violations = err.violations().unwrap();
    assert!(violations.contains(ProfileRule::NameConvention));
    assert!(violations.contains(ProfileRule::Version));
    assert_eq!(violations.len(), 2);
}

#[test]
fn duplicate_policy_type_is_invalid_profile() {
    let xml = r#"<profile format="1">
  <name>demo</name>
  <export><policy_type>a</policy_type><policy_type>b</policy_type></export>
</profile>"#;
    let dir = profile_tree(&[(PROFILE_MANIFEST_FILENAME, xml)]);
    let err = parse_profile(dir.path()).unwrap_err();
    assert!(err.to_string().ends_with("Only one <policy_type> element is permitted."));
    assert!(err.violations().unwrap().contains(ProfileRule::PolicyType));
}

#[test]
fn format_errors_are_not_wrapped() {
    for (format, malformed) in [("0", true), ("-1", true), ("2", false)] {
        let xml = manifest("").replace("format=\"1\"", &format!("format=\"{format}\""));
        let dir = profile_tree(&[(PROFILE_MANIFEST_FILENAME, xml.as_str())]);
        let err = parse_profile(dir.path()).unwrap_err();
        assert!(err.is_format_error(), "format {format}: {err}");
        assert_eq!(
            matches!(err, ProfileError::MalformedFormat { .. }),
            malformed,
            "format {format}"
        );
    }
}

#[test]
fn missing_manifest_and_missing_path() {
    let empty = tempfile::tempdir().unwrap();
    assert!(matches!(
        parse_profile(empty.path()),
        Err(ProfileError::MissingManifest { .. })
    ));
    assert!(matches!(
        parse_profile(empty.path().join("absent")),
        Err(ProfileError::NotAProfile { .. })
    ));
}

// =========================================================================
// Bootstrap
// =========================================================================

#[test]
fn bootstrapped_profile_parses_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("new_profile");
    bootstrap_profile(&target).unwrap();

    let profile = ProfileParser::bundled().unwrap().parse(&target).unwrap();
    assert_eq!(profile.name.as_deref(), Some("template_profile"));
    assert_eq!(profile.version.as_deref(), Some("0.0.0"));
    assert_eq!(profile.get_policy_type().unwrap(), "keymint_ros");

    let policies = profile.policies.as_deref().unwrap();
    assert_eq!(policy_names(policies), vec!["talker", "listener"]);
    for policy in policies {
        assert_eq!(policy.find_text("default"), Some("DENY"));
        assert!(policy.find("validity/not_after").is_some());
    }

    let authorities = profile.authorities.as_deref().unwrap();
    assert_eq!(authorities.len(), 2);
    for authority in authorities {
        assert_eq!(authority.find_text("certificate/digest"), Some("sha256"));
        assert!(authority.find("certificate/subject_name").is_some());
        assert_eq!(authority.find_text("key/curve"), Some("secp256r1"));
    }
}

#[test]
fn bootstrap_refuses_existing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = bootstrap_profile(dir.path()).unwrap_err();
    assert!(matches!(err, ProfileError::TargetExists { .. }));
    assert!(!dir.path().join(PROFILE_MANIFEST_FILENAME).exists());
}
