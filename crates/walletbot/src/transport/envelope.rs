use serde::Serialize;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Serialize)]
#[serde(rename = "Response")]
struct MessageResponse<'a> {
    #[serde(rename = "Message")]
    message: &'a str,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to render reply envelope: {0}")]
pub struct EnvelopeError(String);

/// Wraps a reply in the messaging webhook's XML response document.
pub fn render_reply(message: &str) -> Result<String, EnvelopeError> {
    let body = quick_xml::se::to_string(&MessageResponse { message })
        .map_err(|err| EnvelopeError(err.to_string()))?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_message_in_response_document() {
        let xml = render_reply("Hello").expect("renders");
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>Hello</Message></Response>"#
        );
    }

    #[test]
    fn escapes_markup_in_replies() {
        let xml = render_reply("1 < 2 & \"ok\"").expect("renders");
        assert!(xml.contains("<Message>1 &lt; 2 &amp;"), "{xml}");
        assert!(!xml.contains("1 < 2"));
    }
}
