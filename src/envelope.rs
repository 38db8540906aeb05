//! Envelope Module
//!
//! String templating for the XML documents the protocol exchanges: the
//! protocol-creation result and the upload-position report. Pure
//! formatting, no parsing.

use crate::range_set::ByteInterval;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Build the `<Resultado>` document returned when a protocol is created,
/// including the atom link to the protocol's content URL.
pub fn protocol_created(base_url: &str, protocol: &str) -> String {
    format!(
        "{decl}<Resultado xmlns:atom=\"http://www.w3.org/2005/Atom\">\
         <Protocolo>{protocol}</Protocolo>\
         <atom:link href=\"{base_url}/staws/arquivos/{protocol}/conteudo\" \
         rel=\"conteudo\" type=\"application/octet-stream\"/>\
         </Resultado>",
        decl = XML_DECLARATION,
    )
}

/// Build the `<PosicaoUpload>` document listing the received intervals.
pub fn upload_position(ranges: &[ByteInterval]) -> String {
    let mut doc = String::from(XML_DECLARATION);
    doc.push_str("<PosicaoUpload>");
    for interval in ranges {
        doc.push_str(&format!(
            "<Posicao><Inicio>{}</Inicio><Fim>{}</Fim></Posicao>",
            interval.start, interval.end
        ));
    }
    doc.push_str("</PosicaoUpload>");
    doc
}
