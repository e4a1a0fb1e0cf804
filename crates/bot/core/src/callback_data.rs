use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::Serialize;
use teloxide::types::InlineKeyboardButton;

pub fn encode_data<T>(data: &T, type_id: u32) -> String
where
    T: Serialize + ?Sized,
{
    hex::encode(bincode::serialize(&(data, type_id)).unwrap_or_default())
}

pub fn decode_data<T>(data: &str) -> Result<(T, u32), eyre::Error>
where
    T: DeserializeOwned,
{
    Ok(bincode::deserialize(&hex::decode(data)?)?)
}

/// Typed callback payloads. The payload carries a hash of the type name,
/// so a button from one flow never decodes into another flow's type.
pub trait Calldata {
    fn to_data(&self) -> String;
    fn from_data(data: &str) -> Option<Self>
    where
        Self: Sized;

    fn button<N: Into<String>>(&self, name: N) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(name, self.to_data())
    }
    fn btn_row<N: Into<String>>(&self, name: N) -> Vec<InlineKeyboardButton> {
        vec![self.button(name)]
    }
}

impl<T> Calldata for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_data(&self) -> String {
        encode_data(self, type_id::<T>())
    }

    fn from_data(data: &str) -> Option<Self> {
        let (data, id) = decode_data(data).ok()?;
        if id != type_id::<T>() {
            return None;
        }
        Some(data)
    }
}

fn type_id<T>() -> u32 {
    let type_name = std::any::type_name::<T>();
    let mut hasher = DefaultHasher::new();
    type_name.hash(&mut hasher);
    (hasher.finish() % u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::Calldata;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct VotePayload {
        applicant: i64,
        approved: bool,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct OtherPayload {
        applicant: i64,
        approved: bool,
    }

    #[test]
    fn round_trips_payload() {
        let payload = VotePayload {
            applicant: 42,
            approved: true,
        };
        let decoded = VotePayload::from_data(&payload.to_data());
        assert_eq!(decoded, Some(payload));
    }

    #[test]
    fn rejects_foreign_type() {
        let payload = VotePayload {
            applicant: 42,
            approved: true,
        };
        assert_eq!(OtherPayload::from_data(&payload.to_data()), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(VotePayload::from_data("not-hex"), None);
        assert_eq!(VotePayload::from_data("deadbeef"), None);
    }
}
