//! RPC registry and dispatcher.
//!
//! An RPC is a typed message addressed by a small numeric code. Both
//! ends register the same types under the same codes; on the wire only
//! the code and the [`serial`](roomwire_protocol::serial) encoding of the
//! message's [`Value`] travel.
//!
//! Routing goes by code only. The registry remembers which Rust type
//! owns each code so a mismatched registration or send is caught
//! locally, but inbound payloads are never inspected to guess a type.

use std::any::TypeId;
use std::collections::BTreeMap;

use roomwire_protocol::{PlayerId, ProtocolError, Value, WireValue, serial};

use crate::SessionError;

type Handler = Box<dyn FnMut(&PlayerId, Value) -> Result<(), ProtocolError> + Send>;

struct Registration {
    type_id: TypeId,
    kind: &'static str,
    handlers: Vec<Handler>,
}

/// Maps RPC codes to message types and their handlers.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use roomwire_protocol::PlayerId;
/// use roomwire_session::RpcRegistry;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
///
/// let mut registry = RpcRegistry::new();
/// registry
///     .register::<String>(1, move |from, text| {
///         sink.lock().unwrap().push(format!("{from}: {text}"));
///     })
///     .unwrap();
///
/// let frame = registry.encode(1, &"hello".to_string()).unwrap();
/// registry.on_receive(&PlayerId::from("alice"), 1, &frame).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec!["alice: hello"]);
/// ```
#[derive(Default)]
pub struct RpcRegistry {
    codes: BTreeMap<u8, Registration>,
}

impl RpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `T` to `code` and adds `handler` for it.
    ///
    /// Registering the same type again under the same code adds another
    /// handler; handlers run in registration order.
    ///
    /// # Errors
    /// [`SessionError::DuplicateCode`] if `code` belongs to another type.
    pub fn register<T: WireValue>(
        &mut self,
        code: u8,
        mut handler: impl FnMut(&PlayerId, T) + Send + 'static,
    ) -> Result<(), SessionError> {
        let entry = self.codes.entry(code).or_insert_with(|| Registration {
            type_id: TypeId::of::<T>(),
            kind: T::KIND,
            handlers: Vec::new(),
        });
        if entry.type_id != TypeId::of::<T>() {
            return Err(SessionError::DuplicateCode {
                code,
                existing: entry.kind,
            });
        }
        entry.handlers.push(Box::new(move |sender, value| {
            handler(sender, T::from_value(value)?);
            Ok(())
        }));
        tracing::debug!(code, kind = T::KIND, "rpc handler registered");
        Ok(())
    }

    /// Binds `T` to `single` and `Vec<T>` to `batch`, both feeding the
    /// same handler logic. A batch invokes the handler once per element,
    /// in order.
    ///
    /// Either both codes are registered or neither is.
    ///
    /// # Errors
    /// [`SessionError::DuplicateCode`] if `single` and `batch` are the
    /// same code, or if either already belongs to another type.
    pub fn register_batched<T, F>(&mut self, single: u8, batch: u8, handler: F) -> Result<(), SessionError>
    where
        T: WireValue,
        F: FnMut(&PlayerId, T) + Clone + Send + 'static,
    {
        if single == batch {
            return Err(SessionError::DuplicateCode { code: batch, existing: T::KIND });
        }
        if let Some(existing) = self.conflict::<T>(single) {
            return Err(SessionError::DuplicateCode { code: single, existing });
        }
        if let Some(existing) = self.conflict::<Vec<T>>(batch) {
            return Err(SessionError::DuplicateCode { code: batch, existing });
        }
        self.register::<T>(single, handler.clone())?;
        let mut each = handler;
        self.register::<Vec<T>>(batch, move |sender, items| {
            for item in items {
                each(sender, item);
            }
        })
    }

    fn conflict<T: WireValue>(&self, code: u8) -> Option<&'static str> {
        self.codes
            .get(&code)
            .filter(|r| r.type_id != TypeId::of::<T>())
            .map(|r| r.kind)
    }

    pub fn is_registered(&self, code: u8) -> bool {
        self.codes.contains_key(&code)
    }

    /// Codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.codes.keys().copied()
    }

    /// Encodes `message` for `code`.
    ///
    /// # Errors
    /// [`SessionError::UnknownCode`] if nothing is registered under
    /// `code`, [`SessionError::WrongType`] if another type is.
    pub fn encode<T: WireValue>(&self, code: u8, message: &T) -> Result<Vec<u8>, SessionError> {
        let registration = self.codes.get(&code).ok_or(SessionError::UnknownCode(code))?;
        if registration.type_id != TypeId::of::<T>() {
            return Err(SessionError::WrongType {
                code,
                registered: registration.kind,
                sent: T::KIND,
            });
        }
        Ok(serial::encode_value(&message.to_value()))
    }

    /// Decodes an inbound payload and runs every handler for `code`.
    /// Returns how many handlers ran.
    ///
    /// # Errors
    /// [`SessionError::UnknownCode`] for an unregistered code (no handler
    /// runs), [`SessionError::Protocol`] if the payload is malformed or
    /// isn't a `T`. A handler that fails to decode stops the rest.
    pub fn on_receive(&mut self, sender: &PlayerId, code: u8, data: &[u8]) -> Result<usize, SessionError> {
        let registration = self
            .codes
            .get_mut(&code)
            .ok_or(SessionError::UnknownCode(code))?;
        let value = serial::decode_value(data)?;
        for handler in &mut registration.handlers {
            handler(sender, value.clone())?;
        }
        Ok(registration.handlers.len())
    }
}

impl std::fmt::Debug for RpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.codes.iter().map(|(code, r)| (code, r.kind)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log<T> = Arc<Mutex<Vec<(PlayerId, T)>>>;

    fn log<T>() -> Log<T> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn alice() -> PlayerId {
        PlayerId::from("alice")
    }

    #[test]
    fn test_register_then_receive_round_trip() {
        let seen = log::<String>();
        let sink = Arc::clone(&seen);
        let mut registry = RpcRegistry::new();
        registry
            .register::<String>(1, move |from, msg| sink.lock().unwrap().push((from.clone(), msg)))
            .unwrap();

        let frame = registry.encode(1, &"hello".to_string()).unwrap();
        let ran = registry.on_receive(&alice(), 1, &frame).unwrap();

        assert_eq!(ran, 1);
        assert_eq!(*seen.lock().unwrap(), vec![(alice(), "hello".to_string())]);
    }

    #[test]
    fn test_register_different_type_same_code_fails() {
        let mut registry = RpcRegistry::new();
        registry.register::<String>(1, |_, _| {}).unwrap();

        let err = registry.register::<i32>(1, |_, _| {}).unwrap_err();

        assert!(matches!(
            err,
            SessionError::DuplicateCode { code: 1, existing: "string" }
        ));
    }

    #[test]
    fn test_register_same_type_twice_runs_both_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = RpcRegistry::new();
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            registry
                .register::<i32>(5, move |_, n| order.lock().unwrap().push((tag, n)))
                .unwrap();
        }

        let frame = registry.encode(5, &7).unwrap();
        assert_eq!(registry.on_receive(&alice(), 5, &frame).unwrap(), 2);
        assert_eq!(*order.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_on_receive_unknown_code_runs_nothing() {
        let seen = log::<i32>();
        let sink = Arc::clone(&seen);
        let mut registry = RpcRegistry::new();
        registry
            .register::<i32>(1, move |from, n| sink.lock().unwrap().push((from.clone(), n)))
            .unwrap();

        let frame = serial::encode_value(&Value::I32(3));
        let err = registry.on_receive(&alice(), 99, &frame).unwrap_err();

        assert!(matches!(err, SessionError::UnknownCode(99)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_on_receive_truncated_payload_is_format_error() {
        let mut registry = RpcRegistry::new();
        registry.register::<String>(1, |_, _| {}).unwrap();

        let err = registry.on_receive(&alice(), 1, &[0x0d, 0, 0, 0, 9, b'x']).unwrap_err();

        assert!(matches!(err, SessionError::Protocol(ProtocolError::Truncated { .. })));
    }

    #[test]
    fn test_on_receive_wrong_value_kind_is_type_mismatch() {
        let mut registry = RpcRegistry::new();
        registry.register::<String>(1, |_, _| {}).unwrap();

        let frame = serial::encode_value(&Value::Bool(true));
        let err = registry.on_receive(&alice(), 1, &frame).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::TypeMismatch { expected: "string", .. })
        ));
    }

    #[test]
    fn test_encode_unregistered_or_wrong_type_fails() {
        let mut registry = RpcRegistry::new();
        registry.register::<i32>(2, |_, _| {}).unwrap();

        assert!(matches!(registry.encode(3, &1i32), Err(SessionError::UnknownCode(3))));
        assert!(matches!(
            registry.encode(2, &"x".to_string()),
            Err(SessionError::WrongType { code: 2, registered: "i32", sent: "string" })
        ));
    }

    #[test]
    fn test_register_batched_single_and_array_share_handler() {
        let seen = log::<i32>();
        let sink = Arc::clone(&seen);
        let mut registry = RpcRegistry::new();
        registry
            .register_batched::<i32, _>(10, 11, move |from, n| {
                sink.lock().unwrap().push((from.clone(), n));
            })
            .unwrap();

        let one = registry.encode(10, &1).unwrap();
        let many = registry.encode(11, &vec![2, 3]).unwrap();
        registry.on_receive(&alice(), 10, &one).unwrap();
        registry.on_receive(&alice(), 11, &many).unwrap();

        let values: Vec<i32> = seen.lock().unwrap().iter().map(|(_, n)| *n).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_register_batched_conflict_leaves_single_code_free() {
        let mut registry = RpcRegistry::new();
        registry.register::<String>(11, |_, _| {}).unwrap();

        assert!(registry.register_batched::<i32, _>(10, 11, |_, _| {}).is_err());
        assert!(!registry.is_registered(10));
        assert_eq!(registry.codes().collect::<Vec<_>>(), vec![11]);
    }

    #[test]
    fn test_register_batched_same_code_twice_registers_nothing() {
        let mut registry = RpcRegistry::new();

        let err = registry.register_batched::<i32, _>(7, 7, |_, _| {}).unwrap_err();

        assert!(matches!(err, SessionError::DuplicateCode { code: 7, .. }));
        assert!(!registry.is_registered(7));
    }

    #[test]
    fn test_register_batched_single_conflict_leaves_batch_code_free() {
        let mut registry = RpcRegistry::new();
        registry.register::<String>(10, |_, _| {}).unwrap();

        let err = registry.register_batched::<i32, _>(10, 11, |_, _| {}).unwrap_err();

        assert!(matches!(err, SessionError::DuplicateCode { code: 10, existing: "string" }));
        assert!(!registry.is_registered(11));
        assert_eq!(registry.codes().collect::<Vec<_>>(), vec![10]);
    }
}
