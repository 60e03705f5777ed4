mod command_input;
mod confirm;
mod form;
mod input;
mod key_result;
mod names;
mod picker;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::Confirm;
pub use form::{Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use names::NameResolver;
pub use picker::{Picker, PickerEvent};
