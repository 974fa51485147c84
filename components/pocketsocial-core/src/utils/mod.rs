use hiro_system_kit::slog::Logger;

/// Logging handle threaded through the engine. Cloning is cheap; a `None`
/// logger silently drops every record, which is what tests use.
#[derive(Clone)]
pub struct Context {
    pub logger: Option<Logger>,
    pub tracer: bool,
}

impl Context {
    pub fn empty() -> Context {
        Context {
            logger: None,
            tracer: false,
        }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }

    pub fn expect_logger(&self) -> &Logger {
        self.logger.as_ref().unwrap()
    }
}

#[cfg(test)]
mod test {
    use super::Context;

    #[test]
    fn empty_context_drops_records() {
        let ctx = Context::empty();
        let mut called = false;
        ctx.try_log(|_| called = true);
        assert!(!called);
    }
}
