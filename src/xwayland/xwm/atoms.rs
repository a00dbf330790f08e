use tracing::{debug, error};
use x11rb::{errors::ConnectionError, protocol::xproto::Atom, NONE};

use super::XwmConnection;

macro_rules! atom_table {
    ($(#[$meta:meta])* $vis:vis $name:ident { $($field:ident,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        #[allow(non_snake_case, missing_docs)]
        $vis struct $name {
            $(pub $field: Atom,)*
        }

        impl $name {
            /// Names of all atoms in the table, in request order
            pub const NAMES: &'static [&'static str] = &[$(stringify!($field),)*];

            fn slots(&mut self) -> Vec<&mut Atom> {
                vec![$(&mut self.$field,)*]
            }

            /// Atoms of the table, in the order of [`Self::NAMES`]
            pub fn values(&self) -> Vec<Atom> {
                vec![$(self.$field,)*]
            }
        }
    };
}

atom_table! {
    /// Atoms used by the XWM
    ///
    /// Unresolved atoms are left at `NONE` (0).
    pub Atoms {
        WL_SURFACE_ID,
        WM_PROTOCOLS,
        WM_S0,
        _NET_SUPPORTED,
        _NET_WM_S0,
        _NET_WM_STATE,
        WM_TAKE_FOCUS,
    }
}

impl Atoms {
    /// Intern all atoms of the table in a single batch.
    ///
    /// A name the server refuses to intern is logged and left unresolved, the remaining
    /// names are still resolved. Only a failure of the connection itself is returned.
    pub fn resolve_all(conn: &dyn XwmConnection) -> Result<Atoms, ConnectionError> {
        let replies = conn.intern_atoms(Self::NAMES)?;

        let mut atoms = Atoms::default();
        for ((name, slot), reply) in Self::NAMES.iter().zip(atoms.slots()).zip(replies) {
            match reply {
                Ok(NONE) => error!(atom = *name, "Could not resolve atom, server returned NONE"),
                Ok(atom) => {
                    debug!(atom = *name, id = atom, "Resolved atom");
                    *slot = atom;
                }
                Err(err) => error!(
                    atom = *name,
                    error_code = err.error_code,
                    "Could not resolve atom, x11 error"
                ),
            }
        }
        Ok(atoms)
    }

    /// Whether `atom` is set and equal to `candidate`
    pub(super) fn matches(atom: Atom, candidate: Atom) -> bool {
        atom != NONE && atom == candidate
    }
}
