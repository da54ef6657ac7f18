use fs_extra::dir::CopyOptions;
use serde_json::json;
use sitegen::config::SiteConfig;
use sitegen::build_site;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn fixture_site() -> (TempDir, PathBuf) {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site");
    let dir = tempdir().unwrap();
    fs_extra::dir::copy(&fixture, dir.path(), &CopyOptions::new().content_only(true)).unwrap();
    let config_path = dir.path().join("site.yaml");
    (dir, config_path)
}

#[test]
fn builds_fixture_site() {
    let (_dir, config_path) = fixture_site();
    let config = SiteConfig::load(&config_path).unwrap();
    let report = build_site(&config).unwrap();

    let names: Vec<&str> = report.registry.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["projects", "team"]);
    assert_eq!(report.generated.len(), 4);
    assert_eq!(report.rendered.len(), 6);

    let public = config.output_dir();
    let mut pages: Vec<String> = fs::read_dir(&public)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".html"))
        .collect();
    pages.sort();
    assert_eq!(
        pages,
        vec![
            "1-ada-lovelace.html",
            "101-open-data-open-cities.html",
            "102-smarter-crowdsourcing.html",
            "2-alan-turing.html",
            "contact.html",
            "index.html",
        ]
    );

    let ada = fs::read_to_string(public.join("1-ada-lovelace.html")).unwrap();
    assert!(ada.contains("<title>Ada Lovelace | GovLab</title>"));
    assert!(ada.contains("<p>Analyst</p>"));

    let project = fs::read_to_string(public.join("102-smarter-crowdsourcing.html")).unwrap();
    assert_eq!(project.trim(), "102:smarter-crowdsourcing");

    let index = fs::read_to_string(public.join("index.html")).unwrap();
    assert!(index.contains("<title>Home | GovLab</title>"));
    assert!(index.contains("<a href=\"1-ada-lovelace.html\">Ada Lovelace</a>"));
    assert!(index.contains("<a href=\"2-alan-turing.html\">Alan Turing</a>"));

    assert!(!public.join("__team.html").exists());
    assert!(!public.join("_layout.html").exists());
    assert!(!public.join("about").exists());
    assert!(public.join("img/logo.svg").is_file());
}

#[test]
fn generated_files_are_written_next_to_templates() {
    let (_dir, config_path) = fixture_site();
    let config = SiteConfig::load(&config_path).unwrap();
    build_site(&config).unwrap();

    let templates = config.templates_dir();
    let generated = fs::read_to_string(templates.join("team/2-alan-turing.html")).unwrap();
    let base = fs::read_to_string(templates.join("__team.html")).unwrap();
    assert_eq!(generated, base);
}

#[test]
fn exports_yaml_data_as_json() {
    let (_dir, config_path) = fixture_site();
    let config = SiteConfig::load(&config_path).unwrap();
    let report = build_site(&config).unwrap();

    let export = config.output_dir().join("data");
    assert_eq!(
        report.exported,
        vec![export.join("projects.json"), export.join("team.json")]
    );
    let team: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(export.join("team.json")).unwrap()).unwrap();
    assert_eq!(
        team,
        json!({"data": [
            {"id": "1", "title": "Ada Lovelace", "role": "Analyst"},
            {"id": "2", "title": "Alan Turing", "role": "Researcher"}
        ]})
    );
}

#[test]
fn hand_written_pages_use_default_record() {
    let (_dir, config_path) = fixture_site();
    let config = SiteConfig::load(&config_path).unwrap();
    fs::write(
        config.templates_dir().join("about/team-2.html"),
        "{{ title }}",
    )
    .unwrap();

    build_site(&config).unwrap();
    assert_eq!(
        fs::read_to_string(config.output_dir().join("team-2.html")).unwrap(),
        "Home"
    );
}

#[test]
fn removing_data_drops_registry_entry() {
    let (_dir, config_path) = fixture_site();
    let config = SiteConfig::load(&config_path).unwrap();
    fs::remove_file(config.data_dir().join("projects.json")).unwrap();

    let report = build_site(&config).unwrap();
    assert!(!report.registry.contains("projects"));
    assert_eq!(report.generated.len(), 2);
}
