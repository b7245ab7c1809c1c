//! Read-only learning content: modules, concept pages, challenges and
//! achievement rules.

use serde::{Deserialize, Serialize};

use crate::domain::{AchievementId, ChallengeId, Difficulty, ModuleId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub xp_reward: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptPage {
    pub title: String,
    pub content: String,
    pub visual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub module_id: ModuleId,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub xp_reward: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualTrigger {
    PerfectScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UnlockRule {
    ModuleCompleted(ModuleId),
    XpThreshold(u64),
    Manual(ManualTrigger),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlock: UnlockRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPair {
    pub role: String,
    pub register: String,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: Vec<Module>,
    concepts: Vec<(ModuleId, Vec<ConceptPage>)>,
    challenges: Vec<Challenge>,
    achievements: Vec<Achievement>,
    register_pairs: Vec<RegisterPair>,
}

impl Catalog {
    /// Builds a catalog. Modules are kept in id order; challenges keep the
    /// order given, which is also their order within a module.
    pub fn new(
        mut modules: Vec<Module>,
        concepts: Vec<(ModuleId, Vec<ConceptPage>)>,
        challenges: Vec<Challenge>,
        achievements: Vec<Achievement>,
        register_pairs: Vec<RegisterPair>,
    ) -> Self {
        modules.sort_by_key(|m| m.id);
        Self {
            modules,
            concepts,
            challenges,
            achievements,
            register_pairs,
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn concepts(&self, id: ModuleId) -> &[ConceptPage] {
        self.concepts
            .iter()
            .find(|(module_id, _)| *module_id == id)
            .map(|(_, pages)| pages.as_slice())
            .unwrap_or(&[])
    }

    pub fn challenges(&self, id: ModuleId) -> Vec<&Challenge> {
        self.challenges
            .iter()
            .filter(|c| c.module_id == id)
            .collect()
    }

    pub fn challenge(&self, id: &ChallengeId) -> Option<&Challenge> {
        self.challenges.iter().find(|c| &c.id == id)
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn register_pairs(&self) -> &[RegisterPair] {
        &self.register_pairs
    }

    /// The x86 assembly course.
    pub fn assembly_quest() -> Self {
        let modules = MODULES
            .iter()
            .map(|(id, title, description, icon, xp)| Module {
                id: ModuleId(*id),
                title: (*title).to_string(),
                description: (*description).to_string(),
                icon: (*icon).to_string(),
                xp_reward: *xp,
            })
            .collect();

        let concepts = CONCEPTS
            .iter()
            .map(|(id, pages)| {
                let pages = pages
                    .iter()
                    .map(|(title, content, visual)| ConceptPage {
                        title: (*title).to_string(),
                        content: (*content).to_string(),
                        visual: (*visual).to_string(),
                    })
                    .collect();
                (ModuleId(*id), pages)
            })
            .collect();

        let challenges = CHALLENGES
            .iter()
            .map(|(module_id, id, prompt, difficulty, xp)| Challenge {
                id: ChallengeId::new(*id),
                module_id: ModuleId(*module_id),
                prompt: (*prompt).to_string(),
                difficulty: *difficulty,
                xp_reward: *xp,
            })
            .collect();

        let achievements = ACHIEVEMENTS
            .iter()
            .map(|(id, title, description, icon, unlock)| Achievement {
                id: AchievementId::new(*id),
                title: (*title).to_string(),
                description: (*description).to_string(),
                icon: (*icon).to_string(),
                unlock: *unlock,
            })
            .collect();

        let register_pairs = REGISTER_PAIRS
            .iter()
            .map(|(role, register)| RegisterPair {
                role: (*role).to_string(),
                register: (*register).to_string(),
            })
            .collect();

        Self::new(modules, concepts, challenges, achievements, register_pairs)
    }
}

const MODULES: &[(u32, &str, &str, &str, u64)] = &[
    (1, "Registers 101", "Learn about x86 registers (EAX, EBX, ECX, EDX, ESP, EBP, ESI, EDI)", "cpu", 100),
    (2, "Memory & Addressing", "Understanding memory addressing modes and MOV instruction", "database", 150),
    (3, "Stack Operations", "Master PUSH, POP, and stack frame management", "layers", 150),
    (4, "Arithmetic & Logic", "ADD, SUB, MUL, DIV, AND, OR, XOR operations", "hash", 200),
    (5, "Control Flow & Jumps", "CMP, JMP, JE, JNE, JG, JL and conditional branching", "git-branch", 200),
    (6, "Procedures & Calling", "CALL, RET, calling conventions, and stack frames", "terminal", 250),
    (7, "Interrupts & Syscalls", "INT 0x80, system calls, and OS interaction", "zap", 250),
    (8, "String Operations", "MOVS, CMPS, SCAS, REP prefix and string handling", "type", 200),
    (9, "File I/O", "Reading and writing files using system calls", "file", 250),
    (10, "Capstone: Complete Program", "Build a full x86 Assembly program from scratch", "award", 500),
];

type PageRow = (&'static str, &'static str, &'static str);

const CONCEPTS: &[(u32, &[PageRow])] = &[
    (1, &[
        ("What is a Register?", "Registers are small, ultra-fast storage locations inside the CPU. Think of them as the CPU's scratchpad: variables that the processor can access instantly without going to memory.", "register-diagram"),
        ("General Purpose Registers", "x86 has 8 general-purpose 32-bit registers: EAX (accumulator), EBX (base), ECX (counter), EDX (data), ESI (source index), EDI (destination index), EBP (base pointer), ESP (stack pointer).", "register-list"),
        ("The MOV Instruction", "MOV is the most fundamental instruction. It copies data from source to destination.\nSyntax: MOV destination, source\nExample: MOV EAX, 42 puts 42 into EAX.\nMOV EBX, EAX copies EAX into EBX.", "mov-flow"),
    ]),
    (2, &[
        ("Memory Layout", "Memory is a vast array of bytes, each with a unique address. Programs have sections: .text (code), .data (initialized data), .bss (uninitialized data), and the stack.", "memory-layout"),
        ("Addressing Modes", "Direct: MOV EAX, [0x1000]\nRegister indirect: MOV EAX, [EBX]\nIndexed: MOV EAX, [EBX+ECX*4]\nThese let you work with arrays and structures.", "addressing-modes"),
        ("LEA Instruction", "LEA (Load Effective Address) calculates an address without accessing memory.\nLEA EAX, [EBX+ECX*4+8] computes the address and stores it in EAX.\nUseful for pointer arithmetic.", "lea-diagram"),
    ]),
    (3, &[
        ("The Stack", "The stack is LIFO (Last In, First Out). ESP always points to the top. The stack grows downward: PUSH decrements ESP, POP increments it.", "stack-diagram"),
        ("PUSH and POP", "PUSH EAX: ESP = ESP - 4, store EAX at [ESP].\nPOP EBX: read [ESP] into EBX, ESP = ESP + 4.\nThe stack is your temporary workspace.", "push-pop"),
        ("Stack Frames", "Prologue: PUSH EBP; MOV EBP, ESP\nEpilogue: MOV ESP, EBP; POP EBP; RET\nLocals: [EBP-4], [EBP-8]\nParams: [EBP+8], [EBP+12]", "stack-frame"),
    ]),
    (4, &[
        ("ADD and SUB", "ADD EAX, EBX adds EBX to EAX.\nSUB EAX, 10 subtracts 10 from EAX.\nBoth set CPU flags (Zero, Carry, Overflow).", "add-sub"),
        ("MUL and DIV", "MUL EBX multiplies EAX by EBX, result in EDX:EAX.\nDIV EBX divides EDX:EAX by EBX.\nAlways XOR EDX, EDX before unsigned division.", "mul-div"),
    ]),
    (5, &[
        ("CMP and Flags", "CMP EAX, EBX subtracts EBX from EAX but only sets flags.\nZF=1 if equal. CF and SF indicate greater/less than.", "cmp-flags"),
        ("Conditional Jumps", "JE (equal), JNE (not equal), JG (greater, signed), JL (less, signed), JA (above, unsigned), JB (below, unsigned).\nThese create if-then-else logic.", "jumps"),
    ]),
    (6, &[
        ("CALL and RET", "CALL pushes the return address and jumps to the function.\nRET pops the return address and jumps back.", "call-ret"),
        ("Calling Conventions", "cdecl: params pushed right-to-left, caller cleans stack.\nReturn value in EAX.\nCallee preserves EBX, ESI, EDI, EBP, ESP.", "convention"),
    ]),
    (7, &[
        ("INT 0x80", "INT 0x80 triggers a Linux system call.\nEAX = syscall number, EBX/ECX/EDX = arguments.\nsys_write=4, sys_exit=1, sys_read=3.", "int80"),
        ("Common System Calls", "sys_exit (1): Exit program.\nsys_read (3): Read input.\nsys_write (4): Write output.\nsys_open (5): Open file.\nsys_close (6): Close file.", "syscalls"),
    ]),
    (8, &[
        ("String Instructions", "MOVSB/MOVSW/MOVSD copies from [ESI] to [EDI].\nCMPSB compares strings. SCASB scans for a value.\nCLD for forward, STD for backward.", "string-ops"),
        ("REP Prefix", "REP repeats ECX times.\nREP MOVSB copies ECX bytes.\nREPE CMPSB compares until mismatch.\nREPNE SCASB scans until match.", "rep-prefix"),
    ]),
    (9, &[
        ("File Operations", "Open: EAX=5, EBX=filename, ECX=flags, EDX=mode.\nRead: EAX=3, EBX=fd, ECX=buffer, EDX=count.\nWrite: EAX=4, same pattern.\nAll via INT 0x80.", "file-io"),
        ("File Descriptors", "Stdin=0, Stdout=1, Stderr=2.\nOpened files get fd 3+.\nUse the fd for all read/write/close operations.", "file-desc"),
    ]),
    (10, &[
        ("Program Structure", "A complete program needs:\nsection .data (strings)\nsection .bss (buffers)\nsection .text with global _start\n_start is the entry point.", "program-struct"),
        ("Putting It All Together", "Combine registers, memory, stack, arithmetic, control flow, procedures, and syscalls.\nAssemble: nasm -f elf32 prog.asm\nLink: ld -m elf_i386 prog.o -o prog", "build-chain"),
    ]),
];

const CHALLENGES: &[(u32, &str, &str, Difficulty, u64)] = &[
    (1, "c1_1", "Write x86 Assembly instructions to:\n1. Move the value 42 into EAX\n2. Copy EAX into EBX\n3. Move the value 100 into ECX", Difficulty::Beginner, 50),
    (1, "c1_2", "Swap the values of EAX and EBX using ECX as a temp register.\nAssume EAX=10 and EBX=20.", Difficulty::Beginner, 50),
    (2, "c2_1", "Write instructions to:\n1. Load the value at memory address in EBX into EAX\n2. Store 255 at the address in ECX", Difficulty::Intermediate, 75),
    (3, "c3_1", "Push 10, 20, 30 onto the stack, then pop them into EAX, EBX, ECX.\nRemember LIFO order!", Difficulty::Intermediate, 75),
    (4, "c4_1", "Move 15 into EAX and 27 into EBX.\nAdd EBX to EAX, then subtract 10 from EAX.", Difficulty::Intermediate, 75),
    (5, "c5_1", "Compare EAX and EBX. If EAX > EBX, jump to \"greater\".\nOtherwise jump to \"less_or_equal\".\nInclude both labels with NOP.", Difficulty::Intermediate, 100),
    (6, "c6_1", "Write function \"add_numbers\":\n1. Set up stack frame\n2. Read params from [EBP+8] and [EBP+12]\n3. Add them, result in EAX\n4. Clean up and return", Difficulty::Advanced, 100),
    (7, "c7_1", "Write Linux x86 Assembly to print \"Hello\" to stdout.\nUse INT 0x80 with sys_write (EAX=4, EBX=1).", Difficulty::Advanced, 100),
    (8, "c8_1", "Use REP MOVSB to copy 10 bytes from ESI to EDI.\nSet ECX to count and use CLD first.", Difficulty::Advanced, 100),
    (9, "c9_1", "Open \"output.txt\" for writing using sys_open.\nEAX=5, flags=0x41 (O_WRONLY|O_CREAT), mode=0644.\nStore the file descriptor.", Difficulty::Advanced, 100),
    (10, "c10_1", "Write a complete x86 Linux program:\n1. Define \"Assembly Quest Complete!\" in .data\n2. Print it with sys_write (EAX=4)\n3. Exit with sys_exit (EAX=1), code 0\nInclude sections and _start.", Difficulty::Capstone, 200),
];

const ACHIEVEMENTS: &[(&str, &str, &str, &str, UnlockRule)] = &[
    ("first_step", "First Step", "Complete your first module", "flag", UnlockRule::ModuleCompleted(ModuleId(1))),
    ("register_master", "Register Master", "Complete Registers 101", "cpu", UnlockRule::ModuleCompleted(ModuleId(1))),
    ("memory_walker", "Memory Walker", "Complete Memory & Addressing", "database", UnlockRule::ModuleCompleted(ModuleId(2))),
    ("stack_overflow", "Stack Overflow", "Complete Stack Operations", "layers", UnlockRule::ModuleCompleted(ModuleId(3))),
    ("math_wizard", "Math Wizard", "Complete Arithmetic & Logic", "hash", UnlockRule::ModuleCompleted(ModuleId(4))),
    ("flow_ctrl", "Flow Controller", "Complete Control Flow", "git-branch", UnlockRule::ModuleCompleted(ModuleId(5))),
    ("proc_pro", "Procedure Pro", "Complete Procedures", "terminal", UnlockRule::ModuleCompleted(ModuleId(6))),
    ("sys_hacker", "System Hacker", "Complete Interrupts", "zap", UnlockRule::ModuleCompleted(ModuleId(7))),
    ("string_th", "String Theory", "Complete String Ops", "type", UnlockRule::ModuleCompleted(ModuleId(8))),
    ("io_master", "I/O Master", "Complete File I/O", "file", UnlockRule::ModuleCompleted(ModuleId(9))),
    ("asm_master", "Assembly Master", "Complete the Capstone", "award", UnlockRule::ModuleCompleted(ModuleId(10))),
    ("xp500", "Rising Star", "Earn 500 XP", "star", UnlockRule::XpThreshold(500)),
    ("xp1000", "Veteran", "Earn 1000 XP", "shield", UnlockRule::XpThreshold(1000)),
    ("xp2000", "Legend", "Earn 2000 XP", "trending-up", UnlockRule::XpThreshold(2000)),
    ("perfect", "Perfectionist", "Score 100% on a challenge", "target", UnlockRule::Manual(ManualTrigger::PerfectScore)),
];

const REGISTER_PAIRS: &[(&str, &str)] = &[
    ("Accumulator", "EAX"),
    ("Base", "EBX"),
    ("Counter", "ECX"),
    ("Data", "EDX"),
    ("Stack Pointer", "ESP"),
    ("Base Pointer", "EBP"),
];

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
