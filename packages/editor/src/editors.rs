//! # Node Editors
//!
//! One editor per mirrored node. An editor owns the textual form of its
//! node and turns a finished in-place edit into an [`EditIntent`]. It never
//! talks to the remote side itself; the view executes the intent.
//!
//! | kind | renders | editable fields |
//! |---|---|---|
//! | element | `<tag a="v">` | tag name, attributes |
//! | text | value | value |
//! | comment | `<!--value-->` | value |
//! | doctype | `<!DOCTYPE …>` | none |
//! | other | node name | none |

use crate::attr_parser::parse_attribute_values;
use crate::errors::EditorError;
use crate::mutations::AttributeEditBatch;
use markup_common::names::is_valid_element_name;
use markup_common::{Attribute, NodeFront, NodeKind};
use tracing::debug;

/// Suffix shown after a value that was cut short
pub const ELLIPSIS: &str = "…";

/// Part of a node the user is editing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EditField {
    TagName,
    /// An existing attribute, by name
    Attribute(String),
    /// The empty slot used to add attributes
    NewAttribute,
    /// Text or comment value
    Value,
}

impl EditField {
    fn label(&self) -> &'static str {
        match self {
            EditField::TagName => "tag name",
            EditField::Attribute(_) => "attribute",
            EditField::NewAttribute => "new attribute",
            EditField::Value => "value",
        }
    }
}

/// What a committed edit asks the remote side to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditIntent {
    ModifyAttributes {
        forward: AttributeEditBatch,
        reverse: AttributeEditBatch,
    },
    SetValue { value: String },
    RenameTag { tag: String },
}

#[derive(Debug, Clone)]
pub enum NodeEditor {
    Element(ElementEditor),
    Text(TextEditor),
    Comment(TextEditor),
    Doctype(DoctypeEditor),
    Generic(GenericEditor),
}

impl NodeEditor {
    pub fn for_node(front: &NodeFront) -> Self {
        match front.kind {
            NodeKind::Element => NodeEditor::Element(ElementEditor::new(front)),
            NodeKind::Text => NodeEditor::Text(TextEditor::new(front)),
            NodeKind::Comment => NodeEditor::Comment(TextEditor::new(front)),
            NodeKind::Doctype => NodeEditor::Doctype(DoctypeEditor::new(front)),
            NodeKind::Document | NodeKind::Other => {
                NodeEditor::Generic(GenericEditor::new(front))
            }
        }
    }

    pub fn render(&self) -> String {
        match self {
            NodeEditor::Element(editor) => editor.render(),
            NodeEditor::Text(editor) => editor.render(),
            NodeEditor::Comment(editor) => format!("<!--{}-->", editor.render()),
            NodeEditor::Doctype(editor) => editor.render(),
            NodeEditor::Generic(editor) => editor.name.clone(),
        }
    }

    /// Refresh from new node metadata
    pub fn update(&mut self, front: &NodeFront) {
        match self {
            NodeEditor::Element(editor) => editor.update(front),
            NodeEditor::Text(editor) | NodeEditor::Comment(editor) => editor.update(front),
            NodeEditor::Doctype(editor) => *editor = DoctypeEditor::new(front),
            NodeEditor::Generic(editor) => editor.name = front.name.clone(),
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        if let NodeEditor::Text(editor) | NodeEditor::Comment(editor) = self {
            editor.selected = selected;
        }
    }

    pub fn is_editable(&self, field: &EditField) -> bool {
        match self {
            NodeEditor::Element(_) => !matches!(field, EditField::Value),
            NodeEditor::Text(_) | NodeEditor::Comment(_) => matches!(field, EditField::Value),
            NodeEditor::Doctype(_) | NodeEditor::Generic(_) => false,
        }
    }

    /// Start editing `field`, returning the text the input starts with
    pub fn begin_edit(&mut self, field: EditField) -> Result<String, EditorError> {
        self.check_editable(&field)?;
        let text = match self {
            NodeEditor::Element(editor) => editor.edit_text(&field),
            NodeEditor::Text(editor) | NodeEditor::Comment(editor) => editor.edit_text(),
            NodeEditor::Doctype(_) | NodeEditor::Generic(_) => String::new(),
        };
        if let NodeEditor::Element(editor) = self {
            editor.editing = Some(field);
        }
        Ok(text)
    }

    /// Finish editing `field`. `committed = false` discards the edit.
    ///
    /// `is_valid_name` decides which parsed attribute names the target
    /// document accepts.
    pub fn on_commit(
        &mut self,
        field: EditField,
        text: &str,
        committed: bool,
        is_valid_name: impl Fn(&str) -> bool,
    ) -> Result<Option<EditIntent>, EditorError> {
        self.check_editable(&field)?;
        match self {
            NodeEditor::Element(editor) => {
                editor.commit(field, text, committed, is_valid_name)
            }
            NodeEditor::Text(editor) | NodeEditor::Comment(editor) => {
                Ok(editor.commit(text, committed))
            }
            NodeEditor::Doctype(_) | NodeEditor::Generic(_) => Ok(None),
        }
    }

    /// Copy of the displayed state without any edit in progress. Put it
    /// back when the remote side refuses the edit being committed.
    pub fn snapshot(&self) -> Self {
        let mut snapshot = self.clone();
        if let NodeEditor::Element(editor) = &mut snapshot {
            editor.editing = None;
        }
        snapshot
    }

    pub fn as_text(&self) -> Option<&TextEditor> {
        match self {
            NodeEditor::Text(editor) | NodeEditor::Comment(editor) => Some(editor),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextEditor> {
        match self {
            NodeEditor::Text(editor) | NodeEditor::Comment(editor) => Some(editor),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementEditor> {
        match self {
            NodeEditor::Element(editor) => Some(editor),
            _ => None,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            NodeEditor::Element(_) => NodeKind::Element,
            NodeEditor::Text(_) => NodeKind::Text,
            NodeEditor::Comment(_) => NodeKind::Comment,
            NodeEditor::Doctype(_) => NodeKind::Doctype,
            NodeEditor::Generic(editor) => editor.kind,
        }
    }

    fn check_editable(&self, field: &EditField) -> Result<(), EditorError> {
        if self.is_editable(field) {
            Ok(())
        } else {
            Err(EditorError::NotEditable {
                kind: self.kind(),
                field: field.label(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSlot {
    name: String,
    value: String,
}

#[derive(Debug, Clone)]
pub struct ElementEditor {
    tag: String,
    is_document_element: bool,

    /// Displayed attributes, in display order
    slots: Vec<AttributeSlot>,

    /// Attributes as last reported by the node
    current: Vec<Attribute>,

    editing: Option<EditField>,
}

impl ElementEditor {
    fn new(front: &NodeFront) -> Self {
        let mut editor = Self {
            tag: front.name.clone(),
            is_document_element: front.is_document_element,
            slots: Vec::new(),
            current: Vec::new(),
            editing: None,
        };
        editor.update(front);
        editor
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute names in display order
    pub fn attribute_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn render(&self) -> String {
        let mut out = format!("<{}", self.tag);
        for slot in &self.slots {
            out.push_str(&format!(" {}=\"{}\"", slot.name, slot.value));
        }
        out.push('>');
        out
    }

    /// Existing slots keep their place, removed attributes disappear and
    /// new ones are placed as if they had been typed at the end. The slot
    /// being edited is left alone.
    fn update(&mut self, front: &NodeFront) {
        self.tag = front.name.clone();
        self.is_document_element = front.is_document_element;
        self.current = front.attributes.clone();

        let editing = match &self.editing {
            Some(EditField::Attribute(name)) => Some(name.clone()),
            _ => None,
        };

        self.slots.retain(|slot| {
            front.has_attribute(&slot.name) || editing.as_deref() == Some(slot.name.as_str())
        });

        for attr in &front.attributes {
            match self.slot_index(&attr.name) {
                Some(index) => self.slots[index].value = attr.value.clone(),
                None => {
                    let mut anchor = self.slots.len();
                    self.place_slot(attr.name.clone(), attr.value.clone(), &mut anchor);
                }
            }
        }
    }

    fn edit_text(&self, field: &EditField) -> String {
        match field {
            EditField::TagName => self.tag.clone(),
            EditField::Attribute(name) => self
                .current
                .iter()
                .find(|a| &a.name == name)
                .map(|a| format!("{}={}", a.name, quote_attribute_value(&a.value)))
                .unwrap_or_default(),
            EditField::NewAttribute | EditField::Value => String::new(),
        }
    }

    fn commit(
        &mut self,
        field: EditField,
        text: &str,
        committed: bool,
        is_valid_name: impl Fn(&str) -> bool,
    ) -> Result<Option<EditIntent>, EditorError> {
        self.editing = None;
        if !committed || text == self.edit_text(&field) {
            return Ok(None);
        }

        match field {
            EditField::TagName => self.commit_tag(text),
            EditField::Attribute(name) => {
                Ok(self.commit_attributes(Some(&name), text, is_valid_name))
            }
            EditField::NewAttribute => Ok(self.commit_attributes(None, text, is_valid_name)),
            EditField::Value => Ok(None),
        }
    }

    fn commit_tag(&self, text: &str) -> Result<Option<EditIntent>, EditorError> {
        let tag = text.trim();
        if self.is_document_element {
            return Err(EditorError::DocumentElement);
        }
        if !is_valid_element_name(tag) {
            return Err(EditorError::InvalidTagName(tag.to_string()));
        }
        if tag.eq_ignore_ascii_case(&self.tag) {
            return Ok(None);
        }
        Ok(Some(EditIntent::RenameTag {
            tag: tag.to_ascii_lowercase(),
        }))
    }

    /// Replace `edited` (if any) with everything parsed out of `text`
    fn commit_attributes(
        &mut self,
        edited: Option<&str>,
        text: &str,
        is_valid_name: impl Fn(&str) -> bool,
    ) -> Option<EditIntent> {
        let mut forward = AttributeEditBatch::new();
        let mut reverse = AttributeEditBatch::new();
        let mut anchor = self.slots.len();

        if let Some(name) = edited {
            self.save_attribute(name, &mut reverse);
            forward.remove_attribute(name);
            if let Some(index) = self.slot_index(name) {
                self.slots.remove(index);
                anchor = index;
            }
        }

        for attr in parse_attribute_values(text, is_valid_name) {
            self.save_attribute(&attr.name, &mut reverse);
            forward.set_attribute(attr.name.clone(), attr.value.clone());
            self.place_slot(attr.name, attr.value, &mut anchor);
        }

        if forward.is_empty() {
            debug!(tag = %self.tag, "Attribute edit produced no changes");
            return None;
        }
        Some(EditIntent::ModifyAttributes { forward, reverse })
    }

    /// Record how to restore `name` to its current state
    fn save_attribute(&self, name: &str, reverse: &mut AttributeEditBatch) {
        match self.current.iter().find(|a| a.name == name) {
            Some(attr) => reverse.set_attribute(name, attr.value.clone()),
            None => reverse.remove_attribute(name),
        }
    }

    fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Insert a slot at `anchor`, except that `id` always goes first and
    /// `class` right after `id`. Any slot with the same name is replaced.
    /// `anchor` ends up just past the inserted slot.
    fn place_slot(&mut self, name: String, value: String, anchor: &mut usize) {
        if let Some(old) = self.slot_index(&name) {
            self.slots.remove(old);
            if old < *anchor {
                *anchor -= 1;
            }
        }

        let position = match name.as_str() {
            "id" => 0,
            "class" => self.slot_index("id").map_or(0, |i| i + 1),
            _ => *anchor,
        }
        .min(self.slots.len());

        self.slots.insert(position, AttributeSlot { name, value });
        if position <= *anchor {
            *anchor += 1;
        }
    }
}

/// Present `value` so that the attribute parser reads it back unchanged
pub fn quote_attribute_value(value: &str) -> String {
    let value = value.replace('&', "&amp;");
    match (value.contains('"'), value.contains('\'')) {
        (false, _) => format!("\"{value}\""),
        (true, false) => format!("'{value}'"),
        (true, true) => format!("\"{}\"", value.replace('"', "&quot;")),
    }
}

#[derive(Debug, Clone)]
pub struct TextEditor {
    short_value: String,
    incomplete: bool,

    /// Fetched long value, valid until the next update
    full_value: Option<String>,

    selected: bool,
}

impl TextEditor {
    fn new(front: &NodeFront) -> Self {
        Self {
            short_value: front.short_value.clone(),
            incomplete: front.incomplete_value,
            full_value: None,
            selected: false,
        }
    }

    pub fn render(&self) -> String {
        match (&self.full_value, self.incomplete) {
            (_, false) => self.short_value.clone(),
            (Some(full), true) if self.selected => full.clone(),
            _ => format!("{}{ELLIPSIS}", self.short_value),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// The selected node shows its whole value, which has to be fetched
    pub fn needs_full_value(&self) -> bool {
        self.selected && self.incomplete && self.full_value.is_none()
    }

    pub fn set_full_value(&mut self, value: String) {
        self.full_value = Some(value);
    }

    fn update(&mut self, front: &NodeFront) {
        self.short_value = front.short_value.clone();
        self.incomplete = front.incomplete_value;
        self.full_value = None;
    }

    fn edit_text(&self) -> String {
        match &self.full_value {
            Some(full) => full.clone(),
            None => self.short_value.clone(),
        }
    }

    fn commit(&mut self, text: &str, committed: bool) -> Option<EditIntent> {
        if !committed || text == self.edit_text() {
            return None;
        }
        Some(EditIntent::SetValue {
            value: text.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DoctypeEditor {
    name: String,
    public_id: Option<String>,
    system_id: Option<String>,
}

impl DoctypeEditor {
    fn new(front: &NodeFront) -> Self {
        Self {
            name: front.name.clone(),
            public_id: front.public_id.clone().filter(|s| !s.is_empty()),
            system_id: front.system_id.clone().filter(|s| !s.is_empty()),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("<!DOCTYPE {}", self.name);
        if let Some(public_id) = &self.public_id {
            out.push_str(&format!(" PUBLIC \"{public_id}\""));
        }
        if let Some(system_id) = &self.system_id {
            out.push_str(&format!(" \"{system_id}\""));
        }
        out.push('>');
        out
    }
}

#[derive(Debug, Clone)]
pub struct GenericEditor {
    name: String,
    kind: NodeKind,
}

impl GenericEditor {
    fn new(front: &NodeFront) -> Self {
        Self {
            name: front.name.clone(),
            kind: front.kind,
        }
    }
}
