//! Shared per-call scaffolding: nesting bound, sticky first error, and
//! decode-side destination materialization.
//!
//! Both codecs' encoders and decoders embed a [`Context`]. Once an
//! operation fails, the context is poisoned and every later operation
//! returns the stored error immediately: the sticky-error contract is
//! enforced here rather than left to caller discipline.
use {
    crate::{
        config::Config,
        desc::{Construct, Descriptor, Shape},
        error::{depth_exceeded, Error, Result},
        ledger::Ledger,
        value::{MapKey, Value},
    },
    std::sync::Arc,
};

pub(crate) struct Context {
    config: Config,
    depth: usize,
    err: Option<Error>,
}

impl Context {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            depth: 0,
            err: None,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Entry check for every public operation.
    pub(crate) fn guard(&self) -> Result<()> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Record the first error; returns `err` for propagation either way.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        if self.err.is_none() {
            self.err = Some(err.clone());
        }
        err
    }

    pub(crate) fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Open one struct/list/map region.
    pub(crate) fn descend(&mut self) -> Result<()> {
        if self.depth == self.config.max_depth {
            return Err(depth_exceeded(self.config.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        debug_assert!(self.depth > 0, "ascend without matching descend");
        self.depth -= 1;
    }
}

/// Register a constructor's rollback hook after its `create` ran.
pub(crate) fn register(ledger: &mut Ledger, constructor: &Arc<dyn Construct>) {
    let constructor = Arc::clone(constructor);
    ledger.add(move || constructor.dismantle());
}

/// Materialize the default for a destination the wire did not carry.
/// Every `create` along the way is registered for rollback, including
/// those of nested record members.
pub(crate) fn fresh_destination(ledger: &mut Ledger, desc: &Descriptor) -> Value {
    if let Some(constructor) = desc.constructor() {
        let value = constructor.create();
        register(ledger, constructor);
        return value;
    }
    if desc.is_nullable() {
        return Value::Null;
    }
    match desc.shape() {
        Shape::Record(fields) => Value::Record(
            fields
                .iter()
                .map(|field| fresh_destination(ledger, field.descriptor()))
                .collect(),
        ),
        _ => desc.default_value(),
    }
}

/// A record constructor seeds the unmatched fields with its own defaults.
pub(crate) fn record_seed(
    ledger: &mut Ledger,
    desc: &Descriptor,
    arity: usize,
) -> Option<Vec<Value>> {
    let constructor = desc.constructor()?;
    let created = constructor.create();
    register(ledger, constructor);
    match created {
        Value::Record(values) if values.len() == arity => Some(values),
        _ => {
            debug_assert!(false, "record constructor must create a record of matching arity");
            None
        }
    }
}

/// A sequence constructor supplies the destination container; decoded
/// elements are appended after whatever it pre-populated.
pub(crate) fn seeded_list(ledger: &mut Ledger, desc: &Descriptor) -> Vec<Value> {
    match desc.constructor() {
        Some(constructor) => {
            let created = constructor.create();
            register(ledger, constructor);
            match created {
                Value::List(items) => items,
                _ => {
                    debug_assert!(false, "sequence constructor must create a list");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    }
}

pub(crate) fn seeded_map(ledger: &mut Ledger, desc: &Descriptor) -> Vec<(MapKey, Value)> {
    match desc.constructor() {
        Some(constructor) => {
            let created = constructor.create();
            register(ledger, constructor);
            match created {
                Value::Map(pairs) => pairs,
                _ => {
                    debug_assert!(false, "map constructor must create a map");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::invalid_value};

    #[test]
    fn first_error_sticks() {
        let mut ctx = Context::new(Config::default());
        assert_eq!(ctx.guard(), Ok(()));
        ctx.fail(invalid_value("first"));
        ctx.fail(invalid_value("second"));
        assert_eq!(ctx.guard(), Err(Error::InvalidValue("first")));
        assert_eq!(ctx.error(), Some(&Error::InvalidValue("first")));
    }

    #[test]
    fn depth_is_bounded() {
        let mut ctx = Context::new(Config {
            max_depth: 2,
            ..Config::default()
        });
        ctx.descend().unwrap();
        ctx.descend().unwrap();
        assert_eq!(ctx.descend(), Err(Error::DepthExceeded(2)));
        ctx.ascend();
        assert_eq!(ctx.descend(), Ok(()));
    }
}
