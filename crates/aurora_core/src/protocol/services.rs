//! # Service Descriptors
//!
//! Static metadata for every RPC service the server exposes or calls. The
//! names and method ids are fixed by the client and must match byte for byte;
//! `Bind` requests identify services only by the 32-bit FNV-1a hash of the
//! fully qualified name.

/// A single method within a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub id: u32,
    pub name: &'static str,
}

/// Name and method table of an RPC service.
#[derive(Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub methods: &'static [MethodDescriptor],
}

impl ServiceDescriptor {
    /// FNV-1a hash of the full service name, as sent in `BindRequest`.
    pub fn hash(&self) -> u32 {
        fnv1a_32(self.name)
    }

    pub fn method_by_id(&self, id: u32) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|m| m.id == id)
    }

    pub fn method_by_name(&self, name: &str) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Looks up a method that is known to exist. Panics otherwise.
    pub fn method(&'static self, name: &str) -> MethodRef {
        match self.method_by_name(name) {
            Some(method) => MethodRef {
                service: self,
                method,
            },
            None => panic!("service {} has no method named {}", self.name, name),
        }
    }
}

/// Fully resolved target of an outbound call.
#[derive(Debug, Clone, Copy)]
pub struct MethodRef {
    pub service: &'static ServiceDescriptor,
    pub method: &'static MethodDescriptor,
}

pub fn fnv1a_32(name: &str) -> u32 {
    const OFFSET_BASIS: u32 = 0x811C_9DC5;
    const PRIME: u32 = 0x0100_0193;

    name.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME)
    })
}

pub const CONNECTION_SERVICE_ID: u32 = 0x0;
pub const AUTHENTICATION_SERVER_ID: u32 = 0x1;
pub const PRESENCE_SERVICE_ID: u32 = 0xB;

pub static CONNECTION_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: "bnet.protocol.connection.ConnectionService",
    methods: &[
        MethodDescriptor { id: 1, name: "Connect" },
        MethodDescriptor { id: 2, name: "Bind" },
    ],
};

pub static AUTHENTICATION_SERVER: ServiceDescriptor = ServiceDescriptor {
    name: "bnet.protocol.authentication.AuthenticationServer",
    methods: &[
        MethodDescriptor { id: 1, name: "Logon" },
        MethodDescriptor { id: 2, name: "ModuleMessage" },
    ],
};

pub static PRESENCE_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: "bnet.protocol.presence.PresenceService",
    methods: &[
        MethodDescriptor { id: 1, name: "Subscribe" },
        MethodDescriptor { id: 2, name: "Unsubscribe" },
        MethodDescriptor { id: 3, name: "Update" },
        MethodDescriptor { id: 4, name: "Query" },
    ],
};

/// Exported by the client; the server calls it to push channel state.
pub static CHANNEL_SUBSCRIBER: ServiceDescriptor = ServiceDescriptor {
    name: "bnet.protocol.channel.ChannelSubscriber",
    methods: &[MethodDescriptor { id: 1, name: "NotifyAdd" }],
};

/// Services a client may import through `Bind`, in lookup order.
pub static SERVER_SERVICES: [(u32, &ServiceDescriptor); 3] = [
    (CONNECTION_SERVICE_ID, &CONNECTION_SERVICE),
    (AUTHENTICATION_SERVER_ID, &AUTHENTICATION_SERVER),
    (PRESENCE_SERVICE_ID, &PRESENCE_SERVICE),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_32(""), 0x811C_9DC5);
        assert_eq!(fnv1a_32("a"), 0xE40C_292C);
        assert_eq!(fnv1a_32("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn method_lookup_by_id_and_name_agree() {
        let by_id = PRESENCE_SERVICE.method_by_id(4).unwrap();
        let by_name = PRESENCE_SERVICE.method_by_name("Query").unwrap();
        assert_eq!(by_id, by_name);
        assert!(AUTHENTICATION_SERVER.method_by_id(9).is_none());
    }

    #[test]
    fn service_hashes_are_distinct() {
        let mut hashes: Vec<u32> = SERVER_SERVICES.iter().map(|(_, s)| s.hash()).collect();
        hashes.push(CHANNEL_SUBSCRIBER.hash());
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), 4);
    }

    #[test]
    #[should_panic(expected = "has no method named")]
    fn method_ref_for_missing_method_panics() {
        CHANNEL_SUBSCRIBER.method("NotifyRemove");
    }
}
