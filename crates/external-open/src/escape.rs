use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters an OS handler may misinterpret. `%`, `#`, `[`, `]` and the
/// reserved set pass through so existing escapes and fragments survive.
const EXTERNAL_HANDLER: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub fn escape_external_handler_value(url: &str) -> String {
    utf8_percent_encode(url, EXTERNAL_HANDLER).to_string()
}
