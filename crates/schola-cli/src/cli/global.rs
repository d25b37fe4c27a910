/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub json: bool,
    pub db: Option<String>,
}
