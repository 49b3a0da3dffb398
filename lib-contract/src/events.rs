//! Contract events
//!
//! Append-only log of what each successful call changed. Rejected calls
//! publish nothing.

use lib_types::{ContractId, Sequence, Symbol};
use serde::{Deserialize, Serialize};

use crate::auth::ArgValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub contract: ContractId,
    pub sequence: Sequence,
    /// First topic is always the event name
    pub topics: Vec<ArgValue>,
    pub data: Vec<ArgValue>,
}

impl ContractEvent {
    pub fn name(&self) -> Option<Symbol> {
        match self.topics.first() {
            Some(ArgValue::Symbol(name)) => Some(*name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ContractEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: ContractEvent) {
        self.events.push(event);
    }

    pub fn all(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&ContractEvent> {
        self.events.last()
    }

    /// Events whose name matches `name`
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ContractEvent> + 'a {
        self.events
            .iter()
            .filter(move |event| event.name().map_or(false, |n| n.as_str() == name))
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Hand the recorded events to the caller and start a fresh log
    pub fn take(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ContractEvent {
        ContractEvent {
            contract: ContractId([7u8; 32]),
            sequence: 1,
            topics: vec![ArgValue::Symbol(Symbol::new(name).unwrap())],
            data: vec![],
        }
    }

    #[test]
    fn test_named_filter() {
        let mut log = EventLog::new();
        log.publish(event("transfer"));
        log.publish(event("mint"));
        log.publish(event("transfer"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.named("transfer").count(), 2);
        assert_eq!(
            log.last().and_then(ContractEvent::name).map(|s| s.to_string()),
            Some("transfer".into())
        );
    }
}
