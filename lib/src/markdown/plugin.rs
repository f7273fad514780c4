use std::borrow::Cow;

use crate::error::Result;

/// A document-level text transformation.
pub trait Plugin {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>>;
}

/// Runs `input` through each plugin in order.
pub fn preprocess<'a>(input: &'a str, plugins: &[&dyn Plugin]) -> Result<Cow<'a, str>> {
    let mut output = Cow::Borrowed(input);
    for plugin in plugins {
        output = match output {
            Cow::Borrowed(input) => plugin.preprocess(input)?,
            Cow::Owned(input) => Cow::Owned(plugin.preprocess(&input)?.into_owned()),
        };
    }

    Ok(output)
}
