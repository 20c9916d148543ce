use super::*;

#[test]
fn interface_names() {
    assert!(validate_interface("org.freedesktop.DBus").is_ok());
    assert!(validate_interface("org.gnome.Shell.Screenshot").is_ok());
    assert!(validate_interface("a_b.c1").is_ok());
    assert!(validate_interface("org").is_err());
    assert!(validate_interface("org.").is_err());
    assert!(validate_interface(".org.gnome").is_err());
    assert!(validate_interface("org.1gnome").is_err());
    assert!(validate_interface("org.gnome-shell").is_err());
    assert!(validate_interface(&format!("a.{}", "b".repeat(254))).is_err());
}

#[test]
fn member_names() {
    assert!(validate_member("Hello").is_ok());
    assert!(validate_member("SelectArea").is_ok());
    assert!(validate_member("_private2").is_ok());
    assert!(validate_member("").is_err());
    assert!(validate_member("2Fast").is_err());
    assert!(validate_member("Get.Id").is_err());
}

#[test]
fn bus_names() {
    assert!(validate_bus_name("org.freedesktop.DBus").is_ok());
    assert!(validate_bus_name("org.example.some-service").is_ok());
    assert!(validate_bus_name(":1.42").is_ok());
    assert!(validate_bus_name(":1").is_err());
    assert!(validate_bus_name(":1.").is_err());
    assert!(validate_bus_name("org").is_err());
    assert!(validate_bus_name("org.1example").is_err());
}

#[test]
fn error_names() {
    assert!(validate_error_name("org.freedesktop.DBus.Error.Failed").is_ok());
    assert!(validate_error_name("Failed").is_err());
}

#[test]
fn invalid_name_is_invalid_argument() {
    let error = validate_member("1").unwrap_err();
    assert_eq!(error.category(), crate::Category::InvalidArgument);
    assert_eq!(error.to_string(), "Invalid member name `1`");
}
