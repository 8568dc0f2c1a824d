//! Optional OS sandboxing.
//!
//! When the checker was generated with sandboxing enabled it calls
//! [`activate`] before exploring. A checker needs almost nothing from the
//! OS at that point — memory, clocks, thread synchronization, and writes
//! to the already-open stdout/stderr — so on Linux we forbid privilege
//! escalation and install a minimal seccomp-BPF allowlist. Other platforms
//! degrade to a no-op.

/// Drops capabilities for the remainder of the process. Aborts on failure:
/// a checker that asked for a sandbox but cannot get one should not run.
pub fn activate() {
    imp::activate();
}

#[cfg(target_os = "linux")]
mod imp {
    use std::io::Write;

    // Subset of the seccomp/BPF constants we need; these are stable ABI.
    const PR_SET_NO_NEW_PRIVS: libc::c_int = 38;
    const PR_SET_SECCOMP: libc::c_int = 22;
    const SECCOMP_MODE_FILTER: libc::c_ulong = 2;

    const BPF_LD: u16 = 0x00;
    const BPF_W: u16 = 0x00;
    const BPF_ABS: u16 = 0x20;
    const BPF_JMP: u16 = 0x05;
    const BPF_JEQ: u16 = 0x10;
    const BPF_K: u16 = 0x00;
    const BPF_RET: u16 = 0x06;

    const SECCOMP_RET_ALLOW: u32 = 0x7fff0000;
    const SECCOMP_RET_KILL: u32 = 0x00000000;

    #[repr(C)]
    struct SockFilter {
        code: u16,
        jt: u8,
        jf: u8,
        k: u32,
    }

    #[repr(C)]
    struct SockFprog {
        len: libc::c_ushort,
        filter: *const SockFilter,
    }

    fn stmt(code: u16, k: u32) -> SockFilter {
        SockFilter {
            code,
            jt: 0,
            jf: 0,
            k,
        }
    }

    fn jump(code: u16, k: u32, jt: u8, jf: u8) -> SockFilter {
        SockFilter { code, jt, jf, k }
    }

    fn die(message: &str) -> ! {
        let _ = writeln!(std::io::stderr(), "sandboxing failed: {}", message);
        std::process::exit(1);
    }

    pub fn activate() {
        if unsafe { libc::prctl(PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) } != 0 {
            die("could not disable privilege escalation");
        }

        // syscalls the exploring checker still needs
        let allowed: &[libc::c_long] = &[
            libc::SYS_brk,
            libc::SYS_clock_gettime,
            libc::SYS_clock_nanosleep,
            libc::SYS_clone,
            libc::SYS_clone3,
            libc::SYS_exit,
            libc::SYS_exit_group,
            libc::SYS_futex,
            libc::SYS_getrandom,
            libc::SYS_gettid,
            libc::SYS_madvise,
            libc::SYS_mmap,
            libc::SYS_mprotect,
            libc::SYS_mremap,
            libc::SYS_munmap,
            libc::SYS_nanosleep,
            libc::SYS_rseq,
            libc::SYS_rt_sigaction,
            libc::SYS_rt_sigprocmask,
            libc::SYS_rt_sigreturn,
            libc::SYS_sched_getaffinity,
            libc::SYS_sched_yield,
            libc::SYS_set_robust_list,
            libc::SYS_sigaltstack,
            libc::SYS_write,
            libc::SYS_writev,
        ];

        let mut filter = Vec::with_capacity(allowed.len() + 3);
        // load the syscall number (offset 0 of struct seccomp_data)
        filter.push(stmt(BPF_LD | BPF_W | BPF_ABS, 0));
        for (i, sys) in allowed.iter().enumerate() {
            let remaining = (allowed.len() - i) as u8;
            filter.push(jump(
                BPF_JMP | BPF_JEQ | BPF_K,
                *sys as u32,
                // jump over the remaining comparisons and the kill, to
                // the allow at the end
                remaining,
                0,
            ));
        }
        filter.push(stmt(BPF_RET | BPF_K, SECCOMP_RET_KILL));
        filter.push(stmt(BPF_RET | BPF_K, SECCOMP_RET_ALLOW));

        let prog = SockFprog {
            len: filter.len() as libc::c_ushort,
            filter: filter.as_ptr(),
        };

        if unsafe {
            libc::prctl(
                PR_SET_SECCOMP,
                SECCOMP_MODE_FILTER,
                &prog as *const SockFprog,
                0,
                0,
            )
        } != 0
        {
            die("could not install the seccomp filter");
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    pub fn activate() {
        // no sandboxing facility on this platform
    }
}
