use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn write_scene(dir: &TempDir) -> std::path::PathBuf {
    let scene = r#"<scene>
  <object>
    <name>Camera</name>
    <type>camera</type>
    <position>0 2 6</position>
    <fov>75</fov>
  </object>
  <object>
    <name>Sun</name>
    <type>directional-light</type>
    <direction>0 -1 0</direction>
    <color>0 255 51</color>
  </object>
  <object>
    <name>Lamp</name>
    <type>point-light</type>
    <position>0 5 0</position>
    <radius>60</radius>
  </object>
  <object>
    <name>Floor</name>
    <type>mesh</type>
    <mesh>floor.obj</mesh>
  </object>
  <object>
    <name>Crate</name>
    <type>mesh</type>
  </object>
</scene>
"#;
    let floor = "\
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
f 1 2 3 4
";
    fs::write(dir.path().join("floor.obj"), floor).expect("write mesh");
    let scene_path = dir.path().join("scene.xml");
    fs::write(&scene_path, scene).expect("write scene");
    scene_path
}

#[test]
fn cli_prints_scene_summary_and_mesh_report() {
    let dir = TempDir::new().expect("temp dir");
    let scene_path = write_scene(&dir);
    let mut cmd = Command::cargo_bin("patina").expect("binary exists");
    cmd.arg(&scene_path).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains(
            "Loaded scene with 5 objects (1 directional, 1 point lights)",
        ))
        .stdout(contains(" - Sun (directional-light)"))
        .stdout(contains(" - floor.obj: 4 vertices, 2 triangles"))
        .stdout(contains(" - Crate uses the built-in cube"));
}

#[test]
fn cli_reports_missing_meshes_without_failing() {
    let dir = TempDir::new().expect("temp dir");
    let scene = r#"<scene>
  <object>
    <name>Ghost</name>
    <type>mesh</type>
    <mesh>missing.obj</mesh>
  </object>
</scene>
"#;
    let scene_path = dir.path().join("scene.xml");
    fs::write(&scene_path, scene).expect("write scene");
    let mut cmd = Command::cargo_bin("patina").expect("binary exists");
    cmd.arg(&scene_path).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains(" - missing.obj: failed to load"));
}

#[test]
fn cli_rejects_unknown_arguments() {
    let mut cmd = Command::cargo_bin("patina").expect("binary exists");
    cmd.arg("scene.xml").arg("--frobnicate");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --frobnicate"));
}
