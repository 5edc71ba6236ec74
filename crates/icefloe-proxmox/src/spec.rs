//! Desired-state descriptor for the virtual machine.
//!
//! [`VmSpec`] is the immutable description of the single VM this
//! stack manages. It is built once from the validated stack config
//! and translated into the Proxmox VE config parameters: UEFI (OVMF)
//! firmware, q35 machine type, host CPU, dedicated memory with
//! ballooning off, two raw write-through disks with discard enabled,
//! one virtio NIC, and a cloud-init drive carrying the SSH user and
//! key list. The VM is always cloned from an existing cloud-init
//! template; boot order is fixed to disk first, then network.

/// All tunables for the Proxmox VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    /// Proxmox target node (e.g. "m0x-01").
    pub node: String,
    /// Numeric VM ID on the Proxmox cluster.
    pub vm_id: u32,
    /// VM ID of the cloud-init template to clone from.
    pub template_vm_id: u32,
    /// Hostname written into cloud-init.
    pub hostname: String,
    /// Number of CPU cores.
    pub cpu_cores: u16,
    /// Memory in megabytes.
    pub memory_mb: u32,
    /// Boot disk size in gigabytes.
    pub boot_disk_gb: u32,
    /// Data disk size in gigabytes (mounted at /data by Ansible).
    pub data_disk_gb: u32,
    /// Proxmox storage pool for disks (e.g. "local-lvm").
    pub storage_pool: String,
    /// Network bridge (e.g. "vmbr0").
    pub network_bridge: String,
    /// Static IP in CIDR notation (e.g. "10.0.0.50/24"). Empty string means DHCP.
    pub ip_address: String,
    /// Gateway for static IP configuration.
    pub gateway: String,
    /// DNS nameserver.
    pub nameserver: String,
    /// Cloud-init DNS search domain.
    pub search_domain: Option<String>,
    /// Default SSH user created by cloud-init.
    pub ssh_user: String,
    /// SSH public keys injected via cloud-init.
    pub ssh_public_keys: Vec<String>,
}

/// How the VM obtains its address, decided at descriptor-build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkAddressMode {
    /// Operator-configured address; resolvable without the guest agent.
    Static { address: String, gateway: String },
    /// DHCP; the address is known only once the guest agent reports it.
    Dynamic,
}

impl NetworkAddressMode {
    /// A non-empty configured address means static, everything else DHCP.
    pub fn detect(ip_address: &str, gateway: &str) -> Self {
        if ip_address.is_empty() {
            NetworkAddressMode::Dynamic
        } else {
            NetworkAddressMode::Static {
                address: ip_address.to_string(),
                gateway: gateway.to_string(),
            }
        }
    }
}

impl VmSpec {
    /// Identity used when wrapping engine failures (`node/vmid`).
    pub fn ident(&self) -> String {
        format!("{}/{}", self.node, self.vm_id)
    }

    pub fn address_mode(&self) -> NetworkAddressMode {
        NetworkAddressMode::detect(&self.ip_address, &self.gateway)
    }

    /// The cloud-init `ipconfig0` value: static or DHCP.
    fn ipconfig0(&self) -> String {
        match self.address_mode() {
            NetworkAddressMode::Static { address, gateway } => {
                if gateway.is_empty() {
                    format!("ip={}", address)
                } else {
                    format!("ip={},gw={}", address, gateway)
                }
            }
            NetworkAddressMode::Dynamic => "ip=dhcp".to_string(),
        }
    }

    /// Full parameter set applied right after the template clone.
    ///
    /// Allocating keys (EFI disk, data disk, cloud-init drive) appear
    /// only here; re-sending them against an existing VM would try to
    /// allocate the volumes a second time.
    pub fn to_create_params(&self) -> Vec<(String, String)> {
        let mut params = self.to_update_params();

        // EFI vars disk required for OVMF firmware.
        params.push((
            "efidisk0".into(),
            format!(
                "{}:1,efitype=4m,pre-enrolled-keys=0,format=raw",
                self.storage_pool
            ),
        ));

        // Data disk: persistent service data (/data), attached by Ansible.
        params.push((
            "scsi1".into(),
            format!(
                "{}:{},format=raw,cache=writethrough,ssd=1,discard=on",
                self.storage_pool, self.data_disk_gb
            ),
        ));

        // Cloud-init drive.
        params.push(("ide2".into(), format!("{}:cloudinit", self.storage_pool)));

        // Disable the empty CD-ROM drive inherited from the template
        // clone. Without this, QEMU fails to start due to ide3: cdrom.
        params.push(("ide3".into(), "none,media=cdrom".into()));

        params
    }

    /// Parameter subset that is safe to re-apply on every run.
    pub fn to_update_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            ("name".into(), self.hostname.clone()),
            // UEFI firmware + q35 machine type (modern PCIe).
            ("bios".into(), "ovmf".into()),
            ("machine".into(), "q35".into()),
            ("cores".into(), self.cpu_cores.to_string()),
            ("sockets".into(), "1".into()),
            ("cpu".into(), "host".into()),
            // Dedicated memory, ballooning disabled.
            ("memory".into(), self.memory_mb.to_string()),
            ("balloon".into(), "0".into()),
            ("scsihw".into(), "virtio-scsi-pci".into()),
            // QEMU guest agent: the source of the deferred address report.
            ("agent".into(), "enabled=1,fstrim_cloned_disks=1,type=virtio".into()),
            (
                "net0".into(),
                format!("virtio,bridge={}", self.network_bridge),
            ),
            // Boot order: disk first, then network. First-boot network
            // installers are not supported by this design.
            ("boot".into(), "order=scsi0;net0".into()),
            ("ostype".into(), "l26".into()),
            ("ciuser".into(), self.ssh_user.clone()),
            ("ipconfig0".into(), self.ipconfig0()),
        ];

        if !self.ssh_public_keys.is_empty() {
            // The API expects the sshkeys value itself URL-encoded.
            params.push((
                "sshkeys".into(),
                percent_encode(&self.ssh_public_keys.join("\n")),
            ));
        }

        if !self.nameserver.is_empty() {
            params.push(("nameserver".into(), self.nameserver.clone()));
        }

        if let Some(domain) = &self.search_domain {
            params.push(("searchdomain".into(), domain.clone()));
        }

        params
    }
}

/// Remove the "/prefix" suffix from a CIDR address
/// (e.g. "172.22.202.50/24" -> "172.22.202.50").
pub fn strip_cidr(addr: &str) -> &str {
    match addr.find('/') {
        Some(idx) => &addr[..idx],
        None => addr,
    }
}

/// Split a newline-separated list of SSH public keys, dropping blank
/// lines.
pub fn split_ssh_keys(keys: &str) -> Vec<String> {
    keys.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Percent-encode everything outside the URL unreserved set.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}
