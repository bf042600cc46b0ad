/// Commands the host shell registers at activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    HelloWorld,
    OpenChat,
}

pub const GREETING: &str = "Hello World from OrbitIA!";

impl HostCommand {
    pub fn all() -> Vec<HostCommand> {
        vec![HostCommand::HelloWorld, HostCommand::OpenChat]
    }

    pub fn id(&self) -> &'static str {
        match self {
            HostCommand::HelloWorld => "orbitia.helloWorld",
            HostCommand::OpenChat => "orbitia.openChat",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            HostCommand::HelloWorld => "Hello World",
            HostCommand::OpenChat => "Open Chat",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HostCommand::HelloWorld => "Show a greeting",
            HostCommand::OpenChat => "Open the OrbitIA chat panel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_namespaced() {
        let ids: Vec<&str> = HostCommand::all().iter().map(HostCommand::id).collect();
        assert_eq!(ids, vec!["orbitia.helloWorld", "orbitia.openChat"]);
    }
}
