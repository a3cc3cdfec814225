//! SOAP request envelopes for the XMLA `Execute` method.

use quick_xml::escape::escape;

pub(crate) const XMLA_NS: &str = "urn:schemas-microsoft-com:xml-analysis";
pub(crate) const EXECUTE_ACTION: &str = "urn:schemas-microsoft-com:xml-analysis:Execute";

/// Session header carried by a request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SessionHeader<'a> {
    Begin,
    Use(&'a str),
    End(&'a str),
}

/// Properties sent with every `Execute`.
#[derive(Debug, Clone)]
pub(crate) struct ExecuteProperties {
    pub catalog: String,
    pub effective_user_name: String,
}

/// Builds an `Execute` envelope running `statement`.
pub(crate) fn execute(
    statement: &str,
    properties: &ExecuteProperties,
    session: SessionHeader<'_>,
) -> String {
    let header = match session {
        SessionHeader::Begin => {
            format!(r#"<BeginSession xmlns="{XMLA_NS}" soap:mustUnderstand="1"/>"#)
        }
        SessionHeader::Use(id) => format!(
            r#"<Session xmlns="{XMLA_NS}" SessionId="{}" soap:mustUnderstand="1"/>"#,
            escape(id)
        ),
        SessionHeader::End(id) => format!(
            r#"<EndSession xmlns="{XMLA_NS}" SessionId="{}" soap:mustUnderstand="1"/>"#,
            escape(id)
        ),
    };

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<soap:Header>{header}</soap:Header>",
            "<soap:Body>",
            r#"<Execute xmlns="{ns}">"#,
            "<Command><Statement>{statement}</Statement></Command>",
            "<Properties><PropertyList>",
            "<Catalog>{catalog}</Catalog>",
            "<EffectiveUserName>{user}</EffectiveUserName>",
            "<Format>Tabular</Format>",
            "<Content>SchemaData</Content>",
            "</PropertyList></Properties>",
            "</Execute>",
            "</soap:Body>",
            "</soap:Envelope>",
        ),
        header = header,
        ns = XMLA_NS,
        statement = escape(statement),
        catalog = escape(properties.catalog.as_str()),
        user = escape(properties.effective_user_name.as_str()),
    )
}
