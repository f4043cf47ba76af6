//! chunk.rs — le bytecode compilé : opcodes, pool de constantes, table de lignes.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Un opcode de la machine. L'ensemble est fermé et correspond exactement à ce
/// que le compilateur émet ; il n'y a pas de place pour des extensions futures
/// (pas de fermetures, pas de classes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    Constant,
    Nil,
    True,
    False,
    Pop,
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Not,
    Negate,
    Print,
    Jump,
    JumpIfFalse,
    Loop,
    Call,
    Return,
}

impl Op {
    /// Nombre d'octets d'opérande qui suivent immédiatement cet opcode dans le
    /// flux de bytecode (hors l'opcode lui-même).
    pub fn operand_len(self) -> usize {
        match self {
            Op::Constant | Op::GetLocal | Op::SetLocal | Op::GetGlobal | Op::DefineGlobal
            | Op::SetGlobal | Op::Call => 1,
            Op::Jump | Op::JumpIfFalse | Op::Loop => 2,
            _ => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Constant => "OP_CONSTANT",
            Op::Nil => "OP_NIL",
            Op::True => "OP_TRUE",
            Op::False => "OP_FALSE",
            Op::Pop => "OP_POP",
            Op::GetLocal => "OP_GET_LOCAL",
            Op::SetLocal => "OP_SET_LOCAL",
            Op::GetGlobal => "OP_GET_GLOBAL",
            Op::DefineGlobal => "OP_DEFINE_GLOBAL",
            Op::SetGlobal => "OP_SET_GLOBAL",
            Op::Equal => "OP_EQUAL",
            Op::Greater => "OP_GREATER",
            Op::Less => "OP_LESS",
            Op::Add => "OP_ADD",
            Op::Subtract => "OP_SUBTRACT",
            Op::Multiply => "OP_MULTIPLY",
            Op::Divide => "OP_DIVIDE",
            Op::Not => "OP_NOT",
            Op::Negate => "OP_NEGATE",
            Op::Print => "OP_PRINT",
            Op::Jump => "OP_JUMP",
            Op::JumpIfFalse => "OP_JUMP_IF_FALSE",
            Op::Loop => "OP_LOOP",
            Op::Call => "OP_CALL",
            Op::Return => "OP_RETURN",
        }
    }

    fn from_u8(byte: u8) -> Self {
        // SAFETY net: la VM ne lit jamais un octet qu'elle n'a pas elle-même
        // émis comme opcode ; un bytecode malformé ici serait un bug interne.
        match byte {
            0 => Op::Constant,
            1 => Op::Nil,
            2 => Op::True,
            3 => Op::False,
            4 => Op::Pop,
            5 => Op::GetLocal,
            6 => Op::SetLocal,
            7 => Op::GetGlobal,
            8 => Op::DefineGlobal,
            9 => Op::SetGlobal,
            10 => Op::Equal,
            11 => Op::Greater,
            12 => Op::Less,
            13 => Op::Add,
            14 => Op::Subtract,
            15 => Op::Multiply,
            16 => Op::Divide,
            17 => Op::Not,
            18 => Op::Negate,
            19 => Op::Print,
            20 => Op::Jump,
            21 => Op::JumpIfFalse,
            22 => Op::Loop,
            23 => Op::Call,
            24 => Op::Return,
            other => panic!("octet d'opcode invalide: {other}"),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Table ligne par pc, compressée par plages (run-length) : la plupart des
/// instructions adjacentes partagent la même ligne source.
#[derive(Debug, Clone, Default)]
pub struct LineTable {
    runs: Vec<LineRun>,
}

#[derive(Debug, Clone, Copy)]
struct LineRun {
    start_pc: usize,
    line: u32,
    len: usize,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pc: usize, line: u32) {
        if let Some(last) = self.runs.last_mut() {
            if last.line == line && last.start_pc + last.len == pc {
                last.len += 1;
                return;
            }
        }
        self.runs.push(LineRun { start_pc: pc, line, len: 1 });
    }

    pub fn line_for(&self, pc: usize) -> u32 {
        for run in &self.runs {
            if pc >= run.start_pc && pc < run.start_pc + run.len {
                return run.line;
            }
        }
        0
    }
}

/// Pool de constantes d'un chunk. Les chaînes identiques sont dédupliquées ;
/// les autres valeurs (nombres, fonctions) sont simplement ajoutées. Le pool
/// est plafonné à 256 entrées, l'index tenant sur un seul octet.
#[derive(Debug, Default)]
pub struct ConstPool {
    values: Vec<Value>,
    strings: ahash::AHashMap<Rc<str>, u8>,
}

impl ConstPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: u8) -> &Value {
        &self.values[index as usize]
    }

    /// Ajoute une constante et renvoie son index, ou `None` si le pool est
    /// déjà plein (256 entrées) : l'appelant doit alors signaler une erreur de
    /// compilation, pas tronquer silencieusement.
    pub fn add(&mut self, value: Value) -> Option<u8> {
        if let Value::String(s) = &value {
            if let Some(&ix) = self.strings.get(s) {
                return Some(ix);
            }
        }
        if self.values.len() >= u8::MAX as usize + 1 {
            return None;
        }
        let ix = self.values.len() as u8;
        if let Value::String(s) = &value {
            self.strings.insert(s.clone(), ix);
        }
        self.values.push(value);
        Some(ix)
    }
}

/// Une unité de bytecode compilée : le flux d'instructions, le pool de
/// constantes associé et la table de lignes pour les diagnostics runtime.
#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub consts: ConstPool,
    pub lines: LineTable,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, byte: u8, line: u32) {
        self.lines.push(self.code.len(), line);
        self.code.push(byte);
    }

    pub fn write_op(&mut self, op: Op, line: u32) {
        self.write_u8(op as u8, line);
    }

    /// Émet `OP_CONSTANT <index>`, ou renvoie `None` si le pool déborde.
    pub fn write_constant(&mut self, value: Value, line: u32) -> Option<()> {
        let ix = self.consts.add(value)?;
        self.write_op(Op::Constant, line);
        self.write_u8(ix, line);
        Some(())
    }

    pub fn read_u8(&self, pc: usize) -> u8 {
        self.code[pc]
    }

    pub fn read_u16(&self, pc: usize) -> u16 {
        u16::from_be_bytes([self.code[pc], self.code[pc + 1]])
    }

    pub fn op_at(&self, pc: usize) -> Op {
        Op::from_u8(self.code[pc])
    }

    pub fn line_for(&self, pc: usize) -> u32 {
        self.lines.line_for(pc)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Patch l'opérande 16 bits big-endian à `at` avec `offset`. Utilisé pour
    /// reboucher les sauts avant une fois leur cible connue.
    pub fn patch_u16(&mut self, at: usize, offset: u16) {
        let bytes = offset.to_be_bytes();
        self.code[at] = bytes[0];
        self.code[at + 1] = bytes[1];
    }

    /// Désassemble le chunk entier en texte lisible, une instruction par ligne.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("== {name} ==\n"));
        let mut pc = 0;
        while pc < self.code.len() {
            pc = self.disassemble_at(&mut out, pc);
        }
        out
    }

    fn disassemble_at(&self, out: &mut String, pc: usize) -> usize {
        let op = self.op_at(pc);
        let line = self.line_for(pc);
        out.push_str(&format!("{pc:04} {line:>4} {}", op.mnemonic()));
        let next = match op.operand_len() {
            1 => {
                let operand = self.read_u8(pc + 1);
                if matches!(op, Op::Constant) {
                    out.push_str(&format!(" {operand:3} '{}'", self.consts.get(operand)));
                } else {
                    out.push_str(&format!(" {operand:3}"));
                }
                pc + 2
            }
            2 => {
                let operand = self.read_u16(pc + 1);
                let target = match op {
                    Op::Loop => pc + 3 - operand as usize,
                    _ => pc + 3 + operand as usize,
                };
                out.push_str(&format!(" {operand:5} -> {target}"));
                pc + 3
            }
            _ => pc + 1,
        };
        out.push('\n');
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_pool_dedupes_strings() {
        let mut pool = ConstPool::new();
        let a = pool.add(Value::string("hi")).unwrap();
        let b = pool.add(Value::string("hi")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn const_pool_rejects_past_256() {
        let mut pool = ConstPool::new();
        for i in 0..256 {
            assert!(pool.add(Value::number(i as f64)).is_some());
        }
        assert!(pool.add(Value::number(999.0)).is_none());
    }

    #[test]
    fn line_table_compresses_runs() {
        let mut lines = LineTable::new();
        lines.push(0, 1);
        lines.push(1, 1);
        lines.push(2, 2);
        assert_eq!(lines.line_for(0), 1);
        assert_eq!(lines.line_for(1), 1);
        assert_eq!(lines.line_for(2), 2);
    }

    #[test]
    fn jump_patch_round_trips() {
        let mut chunk = Chunk::new();
        chunk.write_op(Op::JumpIfFalse, 1);
        chunk.write_u8(0xff, 1);
        chunk.write_u8(0xff, 1);
        let at = 1;
        chunk.patch_u16(at, 42);
        assert_eq!(chunk.read_u16(at), 42);
    }

    #[test]
    fn disassemble_shows_constant_value() {
        let mut chunk = Chunk::new();
        chunk.write_constant(Value::number(1.0), 1).unwrap();
        let text = chunk.disassemble("test");
        assert!(text.contains("OP_CONSTANT"));
        assert!(text.contains('1'));
    }
}
