//! Backend message builders for tests.

pub fn frame(msgtype: u8, body: &[u8]) -> Vec<u8> {
    let mut buf = vec![msgtype];
    buf.extend_from_slice(&(body.len() as u32 + 4).to_be_bytes());
    buf.extend_from_slice(body);
    buf
}

pub fn auth_ok() -> Vec<u8> {
    frame(b'R', &[0, 0, 0, 0])
}

pub fn ready_for_query(status: u8) -> Vec<u8> {
    frame(b'Z', &[status])
}

pub fn parameter_status(name: &str, value: &str) -> Vec<u8> {
    frame(b'S', format!("{name}\0{value}\0").as_bytes())
}

/// Text columns of type `text`.
pub fn row_description(names: &[&str]) -> Vec<u8> {
    let mut body = (names.len() as u16).to_be_bytes().to_vec();
    for name in names {
        body.extend_from_slice(name.as_bytes());
        body.push(0);
        body.extend_from_slice(&0u32.to_be_bytes()); // table oid
        body.extend_from_slice(&0i16.to_be_bytes()); // attribute
        body.extend_from_slice(&25u32.to_be_bytes()); // text
        body.extend_from_slice(&(-1i16).to_be_bytes());
        body.extend_from_slice(&(-1i32).to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
    }
    frame(b'T', &body)
}

pub fn data_row(values: &[Option<&str>]) -> Vec<u8> {
    let mut body = (values.len() as u16).to_be_bytes().to_vec();
    for value in values {
        match value {
            Some(value) => {
                body.extend_from_slice(&(value.len() as i32).to_be_bytes());
                body.extend_from_slice(value.as_bytes());
            },
            None => body.extend_from_slice(&(-1i32).to_be_bytes()),
        }
    }
    frame(b'D', &body)
}

pub fn command_complete(tag: &str) -> Vec<u8> {
    frame(b'C', format!("{tag}\0").as_bytes())
}

fn fields(severity: &str, code: &str, message: &str) -> Vec<u8> {
    format!("S{severity}\0V{severity}\0C{code}\0M{message}\0\0").into_bytes()
}

pub fn error_response(severity: &str, code: &str, message: &str) -> Vec<u8> {
    frame(b'E', &fields(severity, code, message))
}

pub fn notice_response(message: &str) -> Vec<u8> {
    frame(b'N', &fields("NOTICE", "00000", message))
}
