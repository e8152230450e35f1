use std::collections::HashMap;

use crate::frame::RpcId;

/// Binds `(provider_id, RpcId)` pairs to handlers of caller-chosen type `H`.
///
/// Populated once at provider startup and never mutated afterward; the
/// handler type itself is left generic so the connection-handling code in
/// the server crate can store whatever closure or function-pointer shape
/// it needs without this crate knowing about tokio or the backend trait.
pub struct Registry<H> {
    handlers: HashMap<(u16, RpcId), H>,
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Registry {
            handlers: HashMap::new(),
        }
    }

    /// Binds `handler` to `(provider_id, rpc)`. Panics if the pair is
    /// already bound — registration is meant to happen exactly once per
    /// provider, and a silent overwrite would hide a startup bug.
    pub fn register(&mut self, provider_id: u16, rpc: RpcId, handler: H) {
        if self.handlers.insert((provider_id, rpc), handler).is_some() {
            panic!(
                "rpc '{}' already registered for provider {provider_id}",
                rpc.name()
            );
        }
    }

    pub fn get(&self, provider_id: u16, rpc: RpcId) -> Option<&H> {
        self.handlers.get(&(provider_id, rpc))
    }

    pub fn contains(&self, provider_id: u16, rpc: RpcId) -> bool {
        self.handlers.contains_key(&(provider_id, rpc))
    }
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_handler() {
        let mut registry: Registry<u32> = Registry::new();
        registry.register(1, RpcId::Count, 7);
        assert_eq!(registry.get(1, RpcId::Count), Some(&7));
        assert_eq!(registry.get(2, RpcId::Count), None);
        assert_eq!(registry.get(1, RpcId::Put), None);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn rejects_double_registration() {
        let mut registry: Registry<u32> = Registry::new();
        registry.register(1, RpcId::Count, 7);
        registry.register(1, RpcId::Count, 8);
    }
}
