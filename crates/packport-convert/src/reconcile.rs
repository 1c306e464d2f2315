//! Choosing one provisioner list from the container and machine-image templates.

use derive_more::Display;
use packport_core::build::{ANSIBLE_PROVISIONER, ProvisionerStep};
use tracing::{debug, warn};

/// Which template the canonical provisioners came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProvisionerOrigin {
    #[display("container")]
    Container,
    #[display("machine-image")]
    MachineImage,
    #[display("none")]
    None,
}

/// Whether two provisioner lists describe the same steps.
///
/// Lists match when they have the same length and each pair has the same
/// type; ansible steps must also run the same playbook.
pub fn provisioners_match(a: &[ProvisionerStep], b: &[ProvisionerStep]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| steps_match(x, y))
}

fn steps_match(a: &ProvisionerStep, b: &ProvisionerStep) -> bool {
    if a.type_name() != b.type_name() {
        return false;
    }
    a.type_name() != ANSIBLE_PROVISIONER || a.playbook_file() == b.playbook_file()
}

/// Pick the canonical provisioners.
///
/// Container provisioners win whenever there are any. A disagreement with the
/// machine-image template is logged but does not change the choice.
pub fn reconcile(
    container: Vec<ProvisionerStep>,
    machine_image: Vec<ProvisionerStep>,
) -> (Vec<ProvisionerStep>, ProvisionerOrigin) {
    match (container.is_empty(), machine_image.is_empty()) {
        (false, false) => {
            if !provisioners_match(&container, &machine_image) {
                warn!(
                    container = container.len(),
                    machine_image = machine_image.len(),
                    "Container and machine-image provisioners differ, using container provisioners"
                );
            }
            (container, ProvisionerOrigin::Container)
        }
        (false, true) => (container, ProvisionerOrigin::Container),
        (true, false) => {
            debug!("No container provisioners, using machine-image provisioners");
            (machine_image, ProvisionerOrigin::MachineImage)
        }
        (true, true) => (Vec::new(), ProvisionerOrigin::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packport_core::build::{AnsibleProvisioner, ProvisionerKind, ShellProvisioner};

    fn shell() -> ProvisionerStep {
        ProvisionerStep::new(ProvisionerKind::Shell(ShellProvisioner::default()))
    }

    fn ansible(playbook: &str) -> ProvisionerStep {
        ProvisionerStep::new(ProvisionerKind::Ansible(AnsibleProvisioner {
            playbook_file: Some(playbook.to_string()),
            ..Default::default()
        }))
    }

    #[test]
    fn test_match_reflexive_and_symmetric() {
        let a = vec![shell(), ansible("/site.yml")];
        let b = vec![shell(), ansible("/site.yml")];
        assert!(provisioners_match(&a, &a));
        assert!(provisioners_match(&a, &b));
        assert!(provisioners_match(&b, &a));
        assert!(provisioners_match(&[], &[]));
    }

    #[test]
    fn test_mismatches() {
        let a = vec![shell(), ansible("/site.yml")];

        assert!(!provisioners_match(&a, &[shell()]));
        assert!(!provisioners_match(&[shell()], &a));
        assert!(!provisioners_match(&a, &[shell(), ansible("/other.yml")]));
        assert!(!provisioners_match(&a, &[ansible("/site.yml"), shell()]));
    }

    #[test]
    fn test_shell_contents_are_not_compared() {
        let mut other = shell();
        other.kind = ProvisionerKind::Shell(ShellProvisioner {
            inline: vec!["echo different".to_string()],
            scripts: vec![],
        });
        assert!(provisioners_match(&[shell()], &[other]));
    }

    #[test]
    fn test_reconcile_prefers_container() {
        let (chosen, origin) = reconcile(vec![shell()], vec![ansible("/site.yml")]);
        assert_eq!(origin, ProvisionerOrigin::Container);
        assert_eq!(chosen, vec![shell()]);

        let (chosen, origin) = reconcile(vec![], vec![ansible("/site.yml")]);
        assert_eq!(origin, ProvisionerOrigin::MachineImage);
        assert_eq!(chosen, vec![ansible("/site.yml")]);

        let (chosen, origin) = reconcile(vec![], vec![]);
        assert_eq!(origin, ProvisionerOrigin::None);
        assert!(chosen.is_empty());
    }
}
