/// Declares an id newtype backed by a process-wide allocator.
///
/// Ids are handed out in increasing order, skipping values that are still in use,
/// and wrap around on overflow. An id has to be released explicitly once its owner goes away.
macro_rules! id_type {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis struct $name(usize);

        impl $name {
            fn allocator() -> &'static ::std::sync::Mutex<(::std::collections::HashSet<usize>, usize)> {
                static IDS: ::once_cell::sync::Lazy<
                    ::std::sync::Mutex<(::std::collections::HashSet<usize>, usize)>,
                > = ::once_cell::sync::Lazy::new(Default::default);
                &IDS
            }

            pub(crate) fn next() -> Self {
                let (in_use, counter) = &mut *Self::allocator().lock().unwrap();

                if in_use.len() == usize::MAX {
                    panic!("Out of {} values", stringify!($name));
                }

                while !in_use.insert(*counter) {
                    *counter = counter.wrapping_add(1);
                }

                let id = *counter;
                *counter = counter.wrapping_add(1);
                $name(id)
            }

            pub(crate) fn release(self) -> bool {
                Self::allocator().lock().unwrap().0.remove(&self.0)
            }
        }
    };
}

pub(crate) use id_type;
