//! XML-RPC document framing.
//!
//! Both directions of both document kinds are implemented: a client writes
//! `methodCall` and parses `methodResponse`; test doubles and debugging tools
//! do the reverse with the same code.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::TransportError;
use crate::value::WireValue;

/// A decoded `<methodCall>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Dotted method name (`user.get_record`, `Async.message.destroy_many`).
    pub method: String,
    /// Positional parameters.
    pub params: Vec<WireValue>,
}

/// A decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    /// The single value carried by `<params>`.
    Success(WireValue),
    /// An XML-RPC level `<fault>`.
    Fault {
        /// `faultCode`.
        code: i64,
        /// `faultString`.
        message: String,
    },
}

/// Serialize a method call.
pub fn write_method_call(method: &str, params: &[WireValue]) -> Vec<u8> {
    let mut out = String::with_capacity(128 + params.len() * 64);
    out.push_str("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    escape_into(&mut out, method);
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out.into_bytes()
}

/// Serialize a successful method response.
pub fn write_method_response(value: &WireValue) -> Vec<u8> {
    let mut out = String::with_capacity(128);
    out.push_str("<?xml version=\"1.0\"?>\n<methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>\n");
    out.into_bytes()
}

/// Serialize an XML-RPC fault response.
pub fn write_fault(code: i64, message: &str) -> Vec<u8> {
    let fault = WireValue::Struct(vec![
        ("faultCode".to_string(), WireValue::Int(code)),
        ("faultString".to_string(), WireValue::String(message.to_string())),
    ]);
    let mut out = String::with_capacity(128);
    out.push_str("<?xml version=\"1.0\"?>\n<methodResponse><fault>");
    write_value(&mut out, &fault);
    out.push_str("</fault></methodResponse>\n");
    out.into_bytes()
}

/// Serialize a lone `<value>` element, the form a task's `result` field holds.
pub fn write_value_fragment(value: &WireValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Parse a lone `<value>` element.
pub fn parse_value_fragment(text: &str) -> Result<WireValue, TransportError> {
    parse_value(&parse_document(text.as_bytes())?)
}

fn write_value(out: &mut String, value: &WireValue) {
    out.push_str("<value>");
    match value {
        WireValue::Nil => out.push_str("<nil/>"),
        WireValue::Int(v) => {
            let tag = if i32::try_from(*v).is_ok() { "i4" } else { "i8" };
            out.push_str(&format!("<{tag}>{v}</{tag}>"));
        }
        WireValue::Double(v) => out.push_str(&format!("<double>{v}</double>")),
        WireValue::Bool(v) => out.push_str(if *v {
            "<boolean>1</boolean>"
        } else {
            "<boolean>0</boolean>"
        }),
        WireValue::String(s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        WireValue::DateTime(s) => {
            out.push_str("<dateTime.iso8601>");
            escape_into(out, s);
            out.push_str("</dateTime.iso8601>");
        }
        WireValue::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&BASE64.encode(bytes));
            out.push_str("</base64>");
        }
        WireValue::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        WireValue::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
}

/// Parse a `<methodResponse>` document.
pub fn parse_method_response(body: &[u8]) -> Result<MethodResponse, TransportError> {
    let root = parse_document(body)?;
    if root.name != "methodResponse" {
        return Err(protocol(format!("unexpected root element <{}>", root.name)));
    }

    let inner = single_child(&root)?;
    match inner.name.as_str() {
        "params" => {
            let param = single_child(inner)?;
            expect_name(param, "param")?;
            let value = single_child(param)?;
            Ok(MethodResponse::Success(parse_value(value)?))
        }
        "fault" => {
            let value = parse_value(single_child(inner)?)?;
            let code = match value.member("faultCode") {
                Some(WireValue::Int(code)) => *code,
                Some(WireValue::String(code)) => code
                    .trim()
                    .parse()
                    .map_err(|_| protocol(format!("faultCode {code:?} is not an integer")))?,
                _ => return Err(protocol("fault without integer faultCode")),
            };
            let message = match value.member("faultString") {
                Some(WireValue::String(message)) => message.clone(),
                _ => String::new(),
            };
            Ok(MethodResponse::Fault { code, message })
        }
        other => Err(protocol(format!("unexpected <{other}> in methodResponse"))),
    }
}

/// Parse a `<methodCall>` document.
pub fn parse_method_call(body: &[u8]) -> Result<MethodCall, TransportError> {
    let root = parse_document(body)?;
    if root.name != "methodCall" {
        return Err(protocol(format!("unexpected root element <{}>", root.name)));
    }

    let mut method = None;
    let mut params = Vec::new();
    for child in root.elements() {
        match child.name.as_str() {
            "methodName" => method = Some(child.text().trim().to_string()),
            "params" => {
                for param in child.elements() {
                    expect_name(param, "param")?;
                    params.push(parse_value(single_child(param)?)?);
                }
            }
            other => return Err(protocol(format!("unexpected <{other}> in methodCall"))),
        }
    }

    let method = method.ok_or_else(|| protocol("methodCall without methodName"))?;
    Ok(MethodCall { method, params })
}

#[derive(Debug)]
struct Element {
    name: String,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    fn has_significant_text(&self) -> bool {
        self.children
            .iter()
            .any(|node| matches!(node, Node::Text(t) if !t.trim().is_empty()))
    }
}

fn protocol(message: impl Into<String>) -> TransportError {
    TransportError::protocol(message)
}

fn parse_document(body: &[u8]) -> Result<Element, TransportError> {
    let text = std::str::from_utf8(body).map_err(|_| protocol("response body is not UTF-8"))?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| protocol(format!("malformed XML at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(Element {
                    name,
                    children: Vec::new(),
                });
            }
            Event::Empty(empty) => {
                let element = Element {
                    name: String::from_utf8_lossy(empty.name().as_ref()).into_owned(),
                    children: Vec::new(),
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| protocol("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| protocol(format!("bad character data: {e}")))?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned())
                    .map_err(|_| protocol("CDATA is not UTF-8"))?;
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(protocol("document ended inside an element"));
    }
    root.ok_or_else(|| protocol("empty document"))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), TransportError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(protocol("more than one root element")),
    }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), TransportError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(protocol("text outside the root element")),
    }
}

fn expect_name(element: &Element, name: &str) -> Result<(), TransportError> {
    if element.name == name {
        Ok(())
    } else {
        Err(protocol(format!("expected <{name}>, found <{}>", element.name)))
    }
}

fn single_child(element: &Element) -> Result<&Element, TransportError> {
    let mut children = element.elements();
    match (children.next(), children.next()) {
        (Some(child), None) => Ok(child),
        (None, _) => Err(protocol(format!("<{}> is empty", element.name))),
        (Some(_), Some(_)) => Err(protocol(format!(
            "<{}> has more than one child element",
            element.name
        ))),
    }
}

fn parse_value(element: &Element) -> Result<WireValue, TransportError> {
    expect_name(element, "value")?;

    let mut typed = element.elements();
    let inner = match (typed.next(), typed.next()) {
        // An untyped value is a string, whitespace included.
        (None, _) => return Ok(WireValue::String(element.text())),
        (Some(inner), None) if !element.has_significant_text() => inner,
        _ => return Err(protocol("<value> mixes text and typed content")),
    };

    let text = inner.text();
    match inner.name.as_str() {
        "i4" | "int" | "i8" => text
            .trim()
            .parse::<i64>()
            .map(WireValue::Int)
            .map_err(|_| protocol(format!("invalid integer {text:?}"))),
        "double" => text
            .trim()
            .parse::<f64>()
            .map(WireValue::Double)
            .map_err(|_| protocol(format!("invalid double {text:?}"))),
        "boolean" => match text.trim() {
            "1" => Ok(WireValue::Bool(true)),
            "0" => Ok(WireValue::Bool(false)),
            other => Err(protocol(format!("invalid boolean {other:?}"))),
        },
        "string" => Ok(WireValue::String(text)),
        "dateTime.iso8601" => Ok(WireValue::DateTime(text.trim().to_string())),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            BASE64
                .decode(compact.as_bytes())
                .map(WireValue::Base64)
                .map_err(|e| protocol(format!("invalid base64: {e}")))
        }
        "nil" => Ok(WireValue::Nil),
        "array" => {
            let data = single_child(inner)?;
            expect_name(data, "data")?;
            data.elements()
                .map(parse_value)
                .collect::<Result<Vec<_>, _>>()
                .map(WireValue::Array)
        }
        "struct" => {
            let mut members = Vec::new();
            for member in inner.elements() {
                expect_name(member, "member")?;
                let mut name = None;
                let mut value = None;
                for part in member.elements() {
                    match part.name.as_str() {
                        "name" => name = Some(part.text()),
                        "value" => value = Some(parse_value(part)?),
                        other => {
                            return Err(protocol(format!("unexpected <{other}> in member")));
                        }
                    }
                }
                match (name, value) {
                    (Some(name), Some(value)) => members.push((name, value)),
                    _ => return Err(protocol("struct member needs a name and a value")),
                }
            }
            Ok(WireValue::Struct(members))
        }
        other => Err(protocol(format!("unknown value type <{other}>"))),
    }
}
