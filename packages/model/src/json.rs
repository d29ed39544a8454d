//! JSON form of documents:
//! `{"type": "cell", "attrs": {...}, "content": [...]}` and
//! `{"type": "text", "text": "..."}`.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Attrs, Fragment, ModelError, ModelResult, Node, NodeKind};

#[derive(Debug, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl NodeJson {
    fn from_node(node: &Node) -> NodeJson {
        NodeJson {
            kind: node.kind(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(NodeJson::from_node).collect(),
            text: node.text_str().map(str::to_string),
        }
    }

    fn into_node(self) -> ModelResult<Node> {
        if self.kind == NodeKind::Text {
            return match self.text {
                Some(text) => Ok(Node::text(text)),
                None => Err(ModelError::MissingText),
            };
        }
        let children = self
            .content
            .into_iter()
            .map(NodeJson::into_node)
            .collect::<ModelResult<Vec<_>>>()?;
        Node::create_checked(self.kind, self.attrs, Fragment::from_vec(children))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeJson::from_node(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NodeJson::deserialize(deserializer)?
            .into_node()
            .map_err(de::Error::custom)
    }
}

impl Node {
    pub fn from_json(json: &str) -> ModelResult<Node> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::builders::*;
    use crate::{ModelError, Node};

    #[test]
    fn test_parse_document() {
        let json = r#"{
            "type": "doc",
            "content": [{
                "type": "table",
                "content": [{
                    "type": "row",
                    "content": [
                        {"type": "header_cell", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]},
                        {"type": "cell", "attrs": {"colspan": 2}, "content": [{"type": "paragraph"}]}
                    ]
                }]
            }]
        }"#;
        let node = Node::from_json(json).unwrap();
        let expected = doc([table([tr([th("a"), td_with(2, 1, "")])])]);
        assert_eq!(node, expected);
    }

    #[test]
    fn test_text_without_text_is_rejected() {
        let err = Node::from_json(r#"{"type": "doc", "content": [{"type": "paragraph", "content": [{"type": "text"}]}]}"#)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidJson(_)));
    }

    #[test]
    fn test_output_shape() {
        let value = serde_json::to_value(p("x")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "paragraph", "content": [{"type": "text", "text": "x"}]})
        );
    }
}
