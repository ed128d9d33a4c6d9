use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VellumError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(VellumError::render("x").to_string().contains("render error:"));
    assert!(
        VellumError::allocation("x")
            .to_string()
            .contains("allocation error:")
    );
    assert!(
        VellumError::reference("x")
            .to_string()
            .contains("reference error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VellumError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
