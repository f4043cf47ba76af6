//! vm.rs — boucle de dispatch : une pile d'opérandes, une pile de frames
//! d'appel, des globales partagées par nom.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use ahash::AHashMap;

use vitte_compiler::{compile, CompileError};
use vitte_core::{Chunk, Function, Op, Value};

use crate::error::VmError;

/// Reçoit le texte imprimé par `OP_PRINT`. `StdoutHost` (le défaut) écrit sur
/// la sortie standard ; un hôte de test peut capturer les lignes à la place.
pub trait Host {
    fn print(&mut self, rendered: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutHost;

impl Host for StdoutHost {
    fn print(&mut self, rendered: &str) {
        println!("{rendered}");
    }
}

/// Hôte de test : accumule chaque ligne imprimée sans toucher au terminal.
#[derive(Debug, Default)]
pub struct CapturingHost {
    pub lines: Vec<String>,
}

impl Host for CapturingHost {
    fn print(&mut self, rendered: &str) {
        self.lines.push(rendered.to_string());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VmOptions {
    /// Profondeur maximale de la pile de frames d'appel.
    pub call_stack_limit: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self { call_stack_limit: 256 }
    }
}

struct CallFrame {
    function: Rc<Function>,
    ip: usize,
    base: usize,
}

/// Résultat de haut niveau d'un appel à `Vm::interpret`, jamais une panique
/// sur une entrée utilisateur : une erreur de compilation ou d'exécution est
/// toujours une valeur renvoyée, pas une déviation de flot de contrôle.
#[derive(Debug)]
pub enum InterpretResult {
    Ok,
    CompileError(Vec<CompileError>),
    RuntimeError(VmError),
}

impl InterpretResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, InterpretResult::Ok)
    }
}

pub struct Vm<H: Host = StdoutHost> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: AHashMap<Rc<str>, Value>,
    last_printed: Option<Value>,
    options: VmOptions,
    host: H,
}

impl Vm<StdoutHost> {
    pub fn new() -> Self {
        Self::with_host(StdoutHost)
    }
}

impl Default for Vm<StdoutHost> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Vm<H> {
    pub fn with_host(host: H) -> Self {
        Self::with_options(host, VmOptions::default())
    }

    pub fn with_options(host: H, options: VmOptions) -> Self {
        let mut vm = Self {
            stack: Vec::new(),
            frames: Vec::new(),
            globals: AHashMap::default(),
            last_printed: None,
            options,
            host,
        };
        vm.install_natives();
        vm
    }

    fn install_natives(&mut self) {
        self.define_native("clock", native_clock);
    }

    /// Enregistre une fonction native dans les globales, à l'instar d'une
    /// variable ordinaire : elle peut être masquée par une déclaration ultérieure.
    pub fn define_native(&mut self, name: &str, f: vitte_core::NativeFn) {
        self.globals.insert(Rc::from(name), Value::native(f));
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.insert(Rc::from(name), value);
    }

    /// Dernière valeur imprimée par `print`, utile aux tests et au REPL.
    pub fn last_printed(&self) -> Option<&Value> {
        self.last_printed.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Compile et exécute une source complète, repartant d'un état frais de
    /// pile/frames à chaque appel (les globales persistent entre appels).
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function = match compile(source) {
            Ok(function) => function,
            Err(errors) => return InterpretResult::CompileError(errors),
        };
        self.stack.clear();
        self.frames.clear();
        self.stack.push(Value::function(function.clone()));
        self.frames.push(CallFrame { function, ip: 0, base: 0 });
        match self.run() {
            Ok(()) => InterpretResult::Ok,
            Err(err) => InterpretResult::RuntimeError(err),
        }
    }

    fn run(&mut self) -> Result<(), VmError> {
        loop {
            let frame_index = self.frames.len() - 1;
            let function = self.frames[frame_index].function.clone();
            let chunk = &function.chunk;
            let mut ip = self.frames[frame_index].ip;
            let op = chunk.op_at(ip);
            ip += 1;

            match op {
                Op::Constant => {
                    let ix = chunk.read_u8(ip);
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    self.push(chunk.consts.get(ix).clone());
                }
                Op::Nil => {
                    self.frames[frame_index].ip = ip;
                    self.push(Value::nil());
                }
                Op::True => {
                    self.frames[frame_index].ip = ip;
                    self.push(Value::bool(true));
                }
                Op::False => {
                    self.frames[frame_index].ip = ip;
                    self.push(Value::bool(false));
                }
                Op::Pop => {
                    self.frames[frame_index].ip = ip;
                    self.pop();
                }
                Op::GetLocal => {
                    let slot = chunk.read_u8(ip) as usize;
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    let base = self.frames[frame_index].base;
                    self.push(self.stack[base + slot].clone());
                }
                Op::SetLocal => {
                    let slot = chunk.read_u8(ip) as usize;
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    let base = self.frames[frame_index].base;
                    let value = self.peek(0).clone();
                    self.stack[base + slot] = value;
                }
                Op::GetGlobal => {
                    let ix = chunk.read_u8(ip);
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    let name = global_name(chunk, ix);
                    let value = self
                        .globals
                        .get(name.as_ref())
                        .cloned()
                        .ok_or_else(|| VmError::UndefinedVariable(name.to_string()))?;
                    self.push(value);
                }
                Op::DefineGlobal => {
                    let ix = chunk.read_u8(ip);
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    let name = global_name(chunk, ix);
                    let value = self.pop();
                    self.globals.insert(name, value);
                }
                Op::SetGlobal => {
                    let ix = chunk.read_u8(ip);
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    let name = global_name(chunk, ix);
                    if !self.globals.contains_key(name.as_ref()) {
                        return Err(VmError::UndefinedVariable(name.to_string()));
                    }
                    let value = self.peek(0).clone();
                    self.globals.insert(name, value);
                }
                Op::Equal => {
                    self.frames[frame_index].ip = ip;
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(a.equals(&b)));
                }
                Op::Greater => {
                    self.frames[frame_index].ip = ip;
                    self.binary_number(|a, b| Value::bool(a > b))?;
                }
                Op::Less => {
                    self.frames[frame_index].ip = ip;
                    self.binary_number(|a, b| Value::bool(a < b))?;
                }
                Op::Add => {
                    self.frames[frame_index].ip = ip;
                    self.add()?;
                }
                Op::Subtract => {
                    self.frames[frame_index].ip = ip;
                    self.binary_number(|a, b| Value::number(a - b))?;
                }
                Op::Multiply => {
                    self.frames[frame_index].ip = ip;
                    self.binary_number(|a, b| Value::number(a * b))?;
                }
                Op::Divide => {
                    self.frames[frame_index].ip = ip;
                    self.binary_number(|a, b| Value::number(a / b))?;
                }
                Op::Not => {
                    self.frames[frame_index].ip = ip;
                    let value = self.pop();
                    self.push(Value::bool(value.is_falsey()));
                }
                Op::Negate => {
                    self.frames[frame_index].ip = ip;
                    if !self.peek(0).is_number() {
                        return Err(VmError::OperandMustBeNumber);
                    }
                    let value = self.pop();
                    self.push(Value::number(-value.as_number()));
                }
                Op::Print => {
                    self.frames[frame_index].ip = ip;
                    let value = self.pop();
                    let rendered = value.to_string();
                    self.host.print(&rendered);
                    self.last_printed = Some(value);
                }
                Op::Jump => {
                    let offset = chunk.read_u16(ip);
                    ip += 2 + offset as usize;
                    self.frames[frame_index].ip = ip;
                }
                Op::JumpIfFalse => {
                    let offset = chunk.read_u16(ip);
                    ip += 2;
                    if self.peek(0).is_falsey() {
                        ip += offset as usize;
                    }
                    self.frames[frame_index].ip = ip;
                }
                Op::Loop => {
                    let offset = chunk.read_u16(ip);
                    ip = ip + 2 - offset as usize;
                    self.frames[frame_index].ip = ip;
                }
                Op::Call => {
                    let argc = chunk.read_u8(ip);
                    ip += 1;
                    self.frames[frame_index].ip = ip;
                    self.call_value(argc)?;
                    continue;
                }
                Op::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().expect("au moins une frame active");
                    self.stack.truncate(frame.base);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result);
                }
            }
        }
    }

    fn call_value(&mut self, argc: u8) -> Result<(), VmError> {
        let callee = self.peek(argc as usize).clone();
        match callee {
            Value::Function(function) => {
                if argc != function.arity {
                    return Err(VmError::ArityMismatch { expected: function.arity, got: argc });
                }
                if self.frames.len() >= self.options.call_stack_limit {
                    return Err(VmError::StackOverflow);
                }
                let base = self.stack.len() - argc as usize - 1;
                self.frames.push(CallFrame { function, ip: 0, base });
                Ok(())
            }
            Value::Native(native) => {
                let start = self.stack.len() - argc as usize;
                let result = native(&self.stack[start..]).map_err(VmError::Native)?;
                self.stack.truncate(start - 1);
                self.push(result);
                Ok(())
            }
            _ => Err(VmError::NotCallable),
        }
    }

    fn add(&mut self) -> Result<(), VmError> {
        let b = self.pop();
        let a = self.pop();
        match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => self.push(Value::number(x + y)),
            (Value::String(x), Value::String(y)) => {
                let mut s = String::with_capacity(x.len() + y.len());
                s.push_str(x);
                s.push_str(y);
                self.push(Value::string(s));
            }
            _ => return Err(VmError::AddOperands),
        }
        Ok(())
    }

    fn binary_number(&mut self, f: impl FnOnce(f64, f64) -> Value) -> Result<(), VmError> {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            return Err(VmError::OperandsMustBeNumbers);
        }
        let b = self.pop();
        let a = self.pop();
        self.push(f(a.as_number(), b.as_number()));
        Ok(())
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("la pile d'opérandes ne doit pas sous-passer")
    }

    fn peek(&self, distance: usize) -> &Value {
        &self.stack[self.stack.len() - 1 - distance]
    }
}

fn global_name(chunk: &Chunk, ix: u8) -> Rc<str> {
    match chunk.consts.get(ix) {
        Value::String(s) => s.clone(),
        other => unreachable!("un index de nom global doit pointer vers une chaîne: {other:?}"),
    }
}

fn native_clock(_args: &[Value]) -> Result<Value, String> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?
        .as_secs();
    Ok(Value::number(secs as f64))
}
