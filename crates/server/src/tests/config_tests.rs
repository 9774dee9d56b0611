use super::{load_settings_from, StubSettings};

use std::{
    env, fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_yields_defaults() {
    let settings = load_settings_from(Path::new("/nonexistent/detector_stub.toml"), no_env);
    assert_eq!(settings, StubSettings::default());
    assert_eq!(settings.bind_addr, "127.0.0.1:5000");
}

#[test]
fn file_describes_a_rich_verdict() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("detector_stub_test_{suffix}.toml"));
    fs::write(
        &path,
        "prediction = \"Steganographic Image\"\nconfidence = 92\ndecryption_method = \"LSB\"\nplain_text = \"secret\"\nmax_upload_bytes = 1024\n",
    )
    .expect("write");

    let settings = load_settings_from(&path, no_env);
    assert_eq!(settings.prediction, "Steganographic Image");
    assert_eq!(settings.confidence, Some(92.0));
    assert_eq!(settings.decryption_method.as_deref(), Some("LSB"));
    assert_eq!(settings.plain_text.as_deref(), Some("secret"));
    assert_eq!(settings.max_upload_bytes, 1024);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn env_overrides_win() {
    let settings = load_settings_from(Path::new("/nonexistent/detector_stub.toml"), |key| {
        match key {
            "STUB_BIND" => Some("0.0.0.0:9000".into()),
            "APP__BIND_ADDR" => Some("127.0.0.1:7000".into()),
            "APP__CONFIDENCE" => Some("9.8".into()),
            "APP__MAX_UPLOAD_BYTES" => Some("oops".into()),
            _ => None,
        }
    });
    assert_eq!(settings.bind_addr, "127.0.0.1:7000");
    assert_eq!(settings.confidence, Some(9.8));
    assert_eq!(
        settings.max_upload_bytes,
        StubSettings::default().max_upload_bytes
    );
}
