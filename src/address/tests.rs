use std::path::PathBuf;

use crate::Category;

use super::{parse, unix_path, Address};

#[test]
fn unix_path_address() -> anyhow::Result<()> {
    assert_eq!(
        parse("unix:path=/run/user/1000/bus")?,
        [Address::Unix(PathBuf::from("/run/user/1000/bus"))]
    );
    Ok(())
}

#[test]
fn abstract_and_guid() -> anyhow::Result<()> {
    assert_eq!(
        parse("unix:abstract=/tmp/dbus-Y7fQ,guid=0123456789abcdef")?,
        [Address::Abstract(b"/tmp/dbus-Y7fQ".to_vec())]
    );
    Ok(())
}

#[test]
fn alternatives_in_order() -> anyhow::Result<()> {
    assert_eq!(
        parse("tcp:host=localhost,port=1234;unix:path=/a;unix:tmpdir=/tmp;unix:path=/b;")?,
        [
            Address::Unix(PathBuf::from("/a")),
            Address::Unix(PathBuf::from("/b")),
        ]
    );
    Ok(())
}

#[test]
fn escapes() -> anyhow::Result<()> {
    assert_eq!(
        parse("unix:path=/tmp/with%20space%2c%3b")?,
        [Address::Unix(PathBuf::from("/tmp/with space,;"))]
    );
    Ok(())
}

#[test]
fn invalid_addresses() {
    for address in [
        "unix",
        "unix:path",
        "unix:path=/a%2",
        "unix:path=/a%zz",
        "unix:path=/a,abstract=b",
    ] {
        let error = parse(address).unwrap_err();
        assert_eq!(error.category(), Category::ConnectionError, "{address}");
    }
}

#[test]
fn unsupported_addresses() {
    for address in ["", "tcp:host=localhost,port=1", "unix:runtime=yes"] {
        let error = parse(address).unwrap_err();
        assert_eq!(error.category(), Category::ConnectionError, "{address}");
    }
}

#[test]
fn display() {
    assert_eq!(
        Address::Unix(PathBuf::from("/a/b")).to_string(),
        "unix:path=/a/b"
    );
}

#[test]
fn escaped_unix_path() -> anyhow::Result<()> {
    let address = unix_path(b"/run/user/1000/my bus,1=%");
    assert_eq!(address, "unix:path=/run/user/1000/my%20bus%2c1%3d%25");
    assert_eq!(
        parse(&address)?,
        [Address::Unix(PathBuf::from("/run/user/1000/my bus,1=%"))]
    );
    Ok(())
}
