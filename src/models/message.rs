// Copyright (c) MoveFeed Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::schema::messages;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i32,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// One conversation partner, as derived from the message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub address: String,
    pub last_message: String,
    pub last_timestamp: DateTime<Utc>,
    pub unread_count: i64,
}

/// Group every message involving `user` by the other party, most recent first
pub fn derive_contacts(user: &str, messages: &[Message]) -> Vec<Contact> {
    let mut contacts: HashMap<&str, Contact> = HashMap::new();

    for message in messages {
        let other = if message.sender == user {
            message.receiver.as_str()
        } else if message.receiver == user {
            message.sender.as_str()
        } else {
            continue;
        };
        let unread = i64::from(message.receiver == user && !message.read);

        let entry = contacts.entry(other).or_insert_with(|| Contact {
            address: other.to_string(),
            last_message: message.content.clone(),
            last_timestamp: message.created_at,
            unread_count: 0,
        });
        if message.created_at > entry.last_timestamp {
            entry.last_message = message.content.clone();
            entry.last_timestamp = message.created_at;
        }
        entry.unread_count += unread;
    }

    let mut contacts: Vec<Contact> = contacts.into_values().collect();
    contacts.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: i32, sender: &str, receiver: &str, secs: i64, read: bool) -> Message {
        Message {
            id,
            sender: sender.into(),
            receiver: receiver.into(),
            content: format!("m{}", id),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            read,
        }
    }

    #[test]
    fn contacts_are_grouped_and_ordered() {
        let log = vec![
            msg(1, "0xa", "0xb", 10, true),
            msg(2, "0xb", "0xa", 20, false),
            msg(3, "0xc", "0xa", 15, false),
            msg(4, "0xc", "0xa", 16, false),
            msg(5, "0xb", "0xc", 30, false),
        ];
        let contacts = derive_contacts("0xa", &log);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].address, "0xb");
        assert_eq!(contacts[0].last_message, "m2");
        assert_eq!(contacts[0].unread_count, 1);
        assert_eq!(contacts[1].address, "0xc");
        assert_eq!(contacts[1].last_message, "m4");
        assert_eq!(contacts[1].unread_count, 2);
    }
}
