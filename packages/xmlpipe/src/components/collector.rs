//! Default final consumer.

use crate::error::ComponentResult;
use crate::event::{Attribute, AttributeDecl, Location, QName, XmlEvent};
use crate::pipeline::{DocumentHandler, DtdContentModelHandler, DtdHandler};

/// Records every event it receives as an owned [`XmlEvent`].
///
/// The record is cleared when a new document starts.
#[derive(Debug, Default, Clone)]
pub struct EventCollector {
    events: Vec<XmlEvent>,
}

impl EventCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    /// Move the recorded events out, leaving the collector empty.
    pub fn take_events(&mut self) -> Vec<XmlEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn record(&mut self, event: XmlEvent) -> ComponentResult {
        self.events.push(event);
        Ok(())
    }
}

impl DocumentHandler for EventCollector {
    fn start_document(&mut self, location: &Location) -> ComponentResult {
        self.events.clear();
        self.record(XmlEvent::StartDocument {
            location: location.clone(),
        })
    }

    fn doctype_decl(
        &mut self,
        root: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> ComponentResult {
        self.record(XmlEvent::DoctypeDecl {
            root: root.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
        })
    }

    fn start_element(
        &mut self,
        name: &QName,
        attributes: &[Attribute],
        _location: &Location,
    ) -> ComponentResult {
        self.record(XmlEvent::StartElement {
            name: name.clone(),
            attributes: attributes.to_vec(),
        })
    }

    fn end_element(&mut self, name: &QName) -> ComponentResult {
        self.record(XmlEvent::EndElement { name: name.clone() })
    }

    fn characters(&mut self, text: &str) -> ComponentResult {
        self.record(XmlEvent::Characters {
            text: text.to_string(),
        })
    }

    fn comment(&mut self, text: &str) -> ComponentResult {
        self.record(XmlEvent::Comment {
            text: text.to_string(),
        })
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> ComponentResult {
        self.record(XmlEvent::ProcessingInstruction {
            target: target.to_string(),
            data: data.map(str::to_string),
        })
    }

    fn end_document(&mut self) -> ComponentResult {
        self.record(XmlEvent::EndDocument)
    }
}

impl DtdHandler for EventCollector {
    fn start_dtd(&mut self) -> ComponentResult {
        self.record(XmlEvent::StartDtd)
    }

    fn element_decl(&mut self, name: &str, content_model: &str) -> ComponentResult {
        self.record(XmlEvent::ElementDecl {
            name: name.to_string(),
            content_model: content_model.to_string(),
        })
    }

    fn attribute_decl(&mut self, element: &str, decl: &AttributeDecl) -> ComponentResult {
        self.record(XmlEvent::AttributeDecl {
            element: element.to_string(),
            decl: decl.clone(),
        })
    }

    fn internal_entity_decl(&mut self, name: &str, value: &str) -> ComponentResult {
        self.record(XmlEvent::InternalEntityDecl {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    fn end_dtd(&mut self) -> ComponentResult {
        self.record(XmlEvent::EndDtd)
    }
}

impl DtdContentModelHandler for EventCollector {
    fn content_model(&mut self, element: &str, model: &str) -> ComponentResult {
        self.record(XmlEvent::ContentModel {
            element: element.to_string(),
            model: model.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_clears_record() {
        let mut collector = EventCollector::new();
        collector.characters("stale").unwrap();
        collector.start_document(&Location::default()).unwrap();
        collector.end_document().unwrap();
        assert_eq!(collector.len(), 2);
        assert!(matches!(collector.events()[0], XmlEvent::StartDocument { .. }));
    }

    #[test]
    fn test_take_events() {
        let mut collector = EventCollector::new();
        collector.start_dtd().unwrap();
        collector.content_model("a", "EMPTY").unwrap();
        let events = collector.take_events();
        assert_eq!(events.len(), 2);
        assert!(collector.is_empty());
    }
}
