#[cfg(target_arch = "x86_64")]
pub fn cpuid(eax: u32, ecx: u32) -> (u32, u32, u32, u32) {
    let mut ebx: u32;
    let mut edx: u32;
    let mut eax_out = eax;
    let mut ecx_out = ecx;

    unsafe {
        std::arch::asm!(
            "mov {0:r}, rbx",
            "cpuid",
            "xchg {0:r}, rbx",
            out(reg) ebx,
            inout("eax") eax_out,
            inout("ecx") ecx_out,
            out("edx") edx,
            options(nostack, preserves_flags)
        );
    }

    (eax_out, ebx, ecx_out, edx)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn cpuid(_eax: u32, _ecx: u32) -> (u32, u32, u32, u32) {
    (0, 0, 0, 0)
}

/// Extended leaf carrying the node identifiers (NodesPerProcessor in ECX[10:8])
pub const NODE_ID_LEAF: u32 = 0x8000_001E;

/// 12-byte vendor string from leaf 0, e.g. "AuthenticAMD"
pub fn vendor() -> String {
    let (_eax, ebx, ecx, edx) = cpuid(0, 0);
    let mut bytes = Vec::with_capacity(12);
    for reg in [ebx, edx, ecx] {
        bytes.extend_from_slice(&reg.to_le_bytes());
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Processor brand string from leaves 0x80000002-0x80000004
pub fn brand_string() -> String {
    let (max_extended, _, _, _) = cpuid(0x8000_0000, 0);
    if max_extended < 0x8000_0004 {
        return String::new();
    }

    let mut bytes = Vec::with_capacity(48);
    for leaf in 0x8000_0002..=0x8000_0004 {
        let (eax, ebx, ecx, edx) = cpuid(leaf, 0);
        for reg in [eax, ebx, ecx, edx] {
            bytes.extend_from_slice(&reg.to_le_bytes());
        }
    }

    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// ECX of the node identifier leaf, 0 when the leaf is not implemented
pub fn node_id_leaf() -> u32 {
    let (max_extended, _, _, _) = cpuid(0x8000_0000, 0);
    if max_extended < NODE_ID_LEAF {
        tracing::warn!(
            "CPUID leaf 0x{:08X} not available, assuming one node per package",
            NODE_ID_LEAF
        );
        return 0;
    }

    let (_eax, _ebx, ecx, _edx) = cpuid(NODE_ID_LEAF, 0);
    ecx
}
