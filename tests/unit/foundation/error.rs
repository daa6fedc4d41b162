use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CartoError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CartoError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        CartoError::geometry("x")
            .to_string()
            .contains("geometry error:")
    );
    assert!(
        CartoError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        CartoError::backend("x")
            .to_string()
            .contains("backend error:")
    );
}

#[test]
fn only_resource_and_backend_errors_are_fatal() {
    assert!(CartoError::resource("oom").is_fatal());
    assert!(CartoError::backend("lost").is_fatal());
    assert!(!CartoError::validation("x").is_fatal());
    assert!(!CartoError::configuration("x").is_fatal());
    assert!(!CartoError::geometry("x").is_fatal());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CartoError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(!err.is_fatal());
}
