//! VM provisioning and IP resolution.
//!
//! [`Provisioner::ensure`] issues exactly one create-or-update
//! against the cluster per run: a missing VM is full-cloned from the
//! configured template, configured, grown to the requested disk sizes
//! and started; an existing VM only gets its mutable config
//! re-applied (the cluster reconciles). It then hands back the VM's
//! address as an [`Output`]:
//!
//! - a configured static address resolves immediately (CIDR suffix
//!   stripped) without waiting on the guest agent;
//! - under DHCP the address settles once the QEMU guest agent reports
//!   the machine's interfaces after boot.

use crate::api::VmApi;
use crate::error::{ProxmoxError, Result};
use crate::spec::{strip_cidr, NetworkAddressMode, VmSpec};
use icefloe_engine::Output;
use std::sync::Arc;
use std::time::Duration;

/// How long to keep asking the guest agent for its interface report.
///
/// Exhausting the poll is not an error: the run completes with an
/// empty address and the next run picks the address up.
#[derive(Debug, Clone)]
pub struct AgentPollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for AgentPollPolicy {
    fn default() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

/// Live handle to the provisioned VM.
pub struct VmHandle {
    /// The machine's reachable IPv4 address; empty string while (or
    /// if) unknown.
    pub ip: Output<String>,
}

/// Creates the VM and wires up the address resolution pipeline.
pub struct Provisioner<A: VmApi + 'static> {
    api: Arc<A>,
    poll: AgentPollPolicy,
}

impl<A: VmApi + 'static> Provisioner<A> {
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            poll: AgentPollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: AgentPollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Create or reconcile the VM described by `spec`.
    ///
    /// Failures are wrapped with the VM's identity (`node/vmid`).
    pub async fn ensure(&self, spec: &VmSpec) -> Result<VmHandle> {
        let wrap = |err: ProxmoxError| ProxmoxError::provision(spec.ident(), err);

        let status = self
            .api
            .vm_status(&spec.node, spec.vm_id)
            .await
            .map_err(wrap)?;

        match status {
            None => {
                tracing::info!(
                    vm = %spec.ident(),
                    template = spec.template_vm_id,
                    "cloning VM from template"
                );
                self.api
                    .clone_vm(&spec.node, spec.template_vm_id, spec.vm_id, &spec.hostname)
                    .await
                    .map_err(wrap)?;
                self.api
                    .configure_vm(&spec.node, spec.vm_id, &spec.to_create_params())
                    .await
                    .map_err(wrap)?;
                // The clone inherits the template's boot disk size.
                self.api
                    .resize_disk(&spec.node, spec.vm_id, "scsi0", spec.boot_disk_gb)
                    .await
                    .map_err(wrap)?;
                self.api
                    .start_vm(&spec.node, spec.vm_id)
                    .await
                    .map_err(wrap)?;
            }
            Some(state) => {
                tracing::info!(vm = %spec.ident(), %state, "reconciling existing VM");
                self.api
                    .configure_vm(&spec.node, spec.vm_id, &spec.to_update_params())
                    .await
                    .map_err(wrap)?;
                if state != "running" {
                    self.api
                        .start_vm(&spec.node, spec.vm_id)
                        .await
                        .map_err(wrap)?;
                }
            }
        }

        let ip = match spec.address_mode() {
            // The operator already knows the address; don't round-trip
            // through the guest agent.
            NetworkAddressMode::Static { address, .. } => {
                Output::resolved(strip_cidr(&address).to_string())
            }
            NetworkAddressMode::Dynamic => self
                .agent_report(spec.node.clone(), spec.vm_id)
                .map(select_address),
        };

        Ok(VmHandle { ip })
    }

    /// The guest agent's per-interface address report as a deferred
    /// value, resolved by a bounded background poll.
    fn agent_report(&self, node: String, vmid: u32) -> Output<Vec<Vec<String>>> {
        let (output, resolver) = Output::pending();
        let api = Arc::clone(&self.api);
        let poll = self.poll.clone();

        tokio::spawn(async move {
            for attempt in 1..=poll.attempts {
                match api.agent_interfaces(&node, vmid).await {
                    Ok(Some(report)) => {
                        tracing::debug!(%node, vmid, attempt, "guest agent reported interfaces");
                        resolver.resolve(report);
                        return;
                    }
                    Ok(None) => {
                        tracing::debug!(%node, vmid, attempt, "guest agent not ready yet");
                        tokio::time::sleep(poll.interval).await;
                    }
                    Err(err) => {
                        resolver.fail(err.to_string());
                        return;
                    }
                }
            }

            tracing::warn!(
                %node,
                vmid,
                "guest agent never reported; the address stays unknown until the next run"
            );
            resolver.resolve(Vec::new());
        });

        output
    }
}

/// Pick the VM's reachable address from the agent's interface report.
///
/// Interface 0 is conventionally loopback and skipped; the first
/// non-empty address on any later interface wins, then interface 0's
/// first address, then the empty string.
pub fn select_address(report: Vec<Vec<String>>) -> String {
    for iface in report.iter().skip(1) {
        if let Some(addr) = iface.iter().find(|addr| !addr.is_empty()) {
            return addr.clone();
        }
    }

    report
        .first()
        .and_then(|iface| iface.first())
        .cloned()
        .unwrap_or_default()
}
