//! Parser for the textual IR.
//!
//! Parsing runs in two stages. The first stage turns the token stream into
//! a name-based syntax tree; the second resolves names against the module
//! (so calls may target functions defined later in the file) and builds
//! real [`Module`] contents. Instruction operands must be defined earlier
//! in the text than their uses.

mod token;

use rustc_hash::FxHashMap;

use crate::ir::{
    BinOp, BlockId, FuncId, Function, Global, GlobalKind, Instr, InstrKind, Module, Param,
    Terminator, Type, Value,
};
use token::Token;

/// A syntax or name-resolution error, with the 1-based line it was found on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// Parse a complete module.
pub fn parse_module(src: &str) -> Result<Module, ParseError> {
    let tokens = token::lex(src)?;
    let items = Parser { tokens, pos: 0 }.module()?;
    lower(items)
}

// ── Syntax ──────────────────────────────────────────────────────────

#[derive(Debug)]
enum RawValue {
    Const(i64),
    Local(String),
    Symbol(String),
}

#[derive(Debug)]
enum RawOp {
    Alloca(RawValue),
    PtrAdd(RawValue, Vec<RawValue>),
    Binary(BinOp, RawValue, RawValue),
    Load(Type, RawValue),
    Store { value: RawValue, ptr: RawValue },
    Call(Type, String, Vec<RawValue>),
}

#[derive(Debug)]
struct RawInstr {
    /// Destination name; `None` for effect-only instructions.
    dst: Option<(String, bool)>,
    op: RawOp,
    line: usize,
}

#[derive(Debug)]
enum RawTerm {
    Ret(Option<RawValue>),
    Br(String),
    CondBr(RawValue, String, String),
    Unreachable,
}

#[derive(Debug)]
struct RawBlock {
    label: String,
    instrs: Vec<RawInstr>,
    term: RawTerm,
    line: usize,
}

#[derive(Debug)]
struct RawFunction {
    name: String,
    ret: Type,
    params: Vec<Param>,
    body: Option<Vec<RawBlock>>,
    line: usize,
}

#[derive(Debug)]
enum Item {
    Global(Global, usize),
    Function(RawFunction),
}

// ── Stage 1: tokens → syntax ────────────────────────────────────────

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |&(_, line)| line)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            line: self.line(),
            message: message.into(),
        })
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Token) -> Result<(), ParseError> {
        match self.peek() {
            Some(tok) if tok == want => {
                self.pos += 1;
                Ok(())
            }
            Some(tok) => {
                let msg = format!("expected {}, found {}", want.describe(), tok.describe());
                self.error(msg)
            }
            None => self.error(format!("expected {}, found end of input", want.describe())),
        }
    }

    fn eat(&mut self, want: &Token) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    fn word(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Some(Token::Word(w)) => Ok(w),
            Some(tok) => {
                self.pos -= 1;
                self.error(format!("expected identifier, found {}", tok.describe()))
            }
            None => self.error("expected identifier, found end of input"),
        }
    }

    fn symbol(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Some(Token::Symbol(s)) => Ok(s),
            Some(tok) => {
                self.pos -= 1;
                self.error(format!("expected `@name`, found {}", tok.describe()))
            }
            None => self.error("expected `@name`, found end of input"),
        }
    }

    fn ty(&mut self) -> Result<Type, ParseError> {
        let word = self.word()?;
        match word.as_str() {
            "void" => Ok(Type::Void),
            "int" => Ok(Type::Int),
            "ptr" => Ok(Type::Ptr),
            _ => {
                self.pos -= 1;
                self.error(format!("unknown type `{word}`"))
            }
        }
    }

    fn value(&mut self) -> Result<RawValue, ParseError> {
        match self.bump() {
            Some(Token::Int(i)) => Ok(RawValue::Const(i)),
            Some(Token::Local(n) | Token::Numbered(n)) => Ok(RawValue::Local(n)),
            Some(Token::Symbol(s)) => Ok(RawValue::Symbol(s)),
            Some(tok) => {
                self.pos -= 1;
                self.error(format!("expected a value, found {}", tok.describe()))
            }
            None => self.error("expected a value, found end of input"),
        }
    }

    fn module(mut self) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        while self.peek().is_some() {
            let line = self.line();
            let keyword = self.word()?;
            match keyword.as_str() {
                "global" => items.push(Item::Global(self.global()?, line)),
                "declare" => items.push(Item::Function(self.signature(line, false)?)),
                "define" => items.push(Item::Function(self.signature(line, true)?)),
                other => {
                    self.pos -= 1;
                    return self.error(format!("expected `global`, `declare` or `define`, found `{other}`"));
                }
            }
        }
        Ok(items)
    }

    fn global(&mut self) -> Result<Global, ParseError> {
        let name = self.symbol()?;
        if !self.eat(&Token::Eq) {
            return Ok(Global {
                name,
                kind: GlobalKind::Scalar,
            });
        }
        self.expect(&Token::LBracket)?;
        let len = match self.bump() {
            Some(Token::Int(i)) => u64::try_from(i).or_else(|_| {
                self.pos -= 1;
                self.error("array length must not be negative")
            })?,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return self.error("expected array length");
            }
        };
        self.expect(&Token::RBracket)?;
        Ok(Global {
            name,
            kind: GlobalKind::Array { len },
        })
    }

    fn signature(&mut self, line: usize, has_body: bool) -> Result<RawFunction, ParseError> {
        let ret = self.ty()?;
        let name = self.symbol()?;
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let ty = self.ty()?;
                let pname = match self.bump() {
                    Some(Token::Local(n)) => n,
                    _ => {
                        self.pos = self.pos.saturating_sub(1);
                        return self.error("expected a named parameter `%name`");
                    }
                };
                params.push(Param::new(pname, ty));
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        let body = if has_body { Some(self.body()?) } else { None };
        Ok(RawFunction {
            name,
            ret,
            params,
            body,
            line,
        })
    }

    fn body(&mut self) -> Result<Vec<RawBlock>, ParseError> {
        self.expect(&Token::LBrace)?;
        let mut blocks = Vec::new();
        while !self.eat(&Token::RBrace) {
            blocks.push(self.block()?);
        }
        if blocks.is_empty() {
            return self.error("function body has no blocks");
        }
        Ok(blocks)
    }

    fn block(&mut self) -> Result<RawBlock, ParseError> {
        let line = self.line();
        let label = self.word()?;
        self.expect(&Token::Colon)?;
        let mut instrs = Vec::new();
        loop {
            if let Some(term) = self.terminator()? {
                return Ok(RawBlock {
                    label,
                    instrs,
                    term,
                    line,
                });
            }
            instrs.push(self.instr()?);
        }
    }

    fn terminator(&mut self) -> Result<Option<RawTerm>, ParseError> {
        let term = if self.is_word("ret") {
            let line = self.line();
            self.pos += 1;
            // `ret` takes a value only if one follows on the same line.
            let has_value = self
                .tokens
                .get(self.pos)
                .is_some_and(|(t, l)| *l == line && matches!(t, Token::Int(_) | Token::Local(_) | Token::Numbered(_) | Token::Symbol(_)));
            RawTerm::Ret(if has_value { Some(self.value()?) } else { None })
        } else if self.is_word("br") {
            self.pos += 1;
            RawTerm::Br(self.word()?)
        } else if self.is_word("condbr") {
            self.pos += 1;
            let cond = self.value()?;
            self.expect(&Token::Comma)?;
            let then_label = self.word()?;
            self.expect(&Token::Comma)?;
            RawTerm::CondBr(cond, then_label, self.word()?)
        } else if self.is_word("unreachable") {
            self.pos += 1;
            RawTerm::Unreachable
        } else {
            return Ok(None);
        };
        Ok(Some(term))
    }

    fn instr(&mut self) -> Result<RawInstr, ParseError> {
        let line = self.line();
        let dst = match self.peek() {
            Some(Token::Local(n)) => Some((n.clone(), true)),
            Some(Token::Numbered(n)) => Some((n.clone(), false)),
            _ => None,
        };
        if dst.is_some() {
            self.pos += 1;
            self.expect(&Token::Eq)?;
        }
        let opcode = self.word()?;
        let op = match opcode.as_str() {
            "alloca" => RawOp::Alloca(self.value()?),
            "ptradd" => {
                let base = self.value()?;
                let mut indices = Vec::new();
                while self.eat(&Token::Comma) {
                    indices.push(self.value()?);
                }
                RawOp::PtrAdd(base, indices)
            }
            "load" => {
                let ty = self.ty()?;
                RawOp::Load(ty, self.value()?)
            }
            "store" => {
                let value = self.value()?;
                self.expect(&Token::Comma)?;
                RawOp::Store {
                    value,
                    ptr: self.value()?,
                }
            }
            "call" => {
                let ty = self.ty()?;
                let callee = self.symbol()?;
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.value()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                RawOp::Call(ty, callee, args)
            }
            other => match BinOp::from_mnemonic(other) {
                Some(op) => {
                    let lhs = self.value()?;
                    self.expect(&Token::Comma)?;
                    RawOp::Binary(op, lhs, self.value()?)
                }
                None => {
                    self.pos -= 1;
                    return self.error(format!("unknown instruction `{other}`"));
                }
            },
        };
        Ok(RawInstr { dst, op, line })
    }
}

// ── Stage 2: syntax → module ────────────────────────────────────────

fn err<T>(line: usize, message: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError {
        line,
        message: message.into(),
    })
}

fn lower(items: Vec<Item>) -> Result<Module, ParseError> {
    let mut module = Module::new();
    let mut funcs: FxHashMap<String, FuncId> = FxHashMap::default();
    let mut bodies = Vec::new();

    for item in items {
        match item {
            Item::Global(global, line) => {
                if module.global_by_name(&global.name).is_some() {
                    return err(line, format!("duplicate global `@{}`", global.name));
                }
                module.add_global(global);
            }
            Item::Function(raw) => {
                if funcs.contains_key(&raw.name) {
                    return err(raw.line, format!("duplicate function `@{}`", raw.name));
                }
                for (i, p) in raw.params.iter().enumerate() {
                    if raw.params[..i].iter().any(|q| q.name == p.name) {
                        return err(raw.line, format!("duplicate parameter `%{}`", p.name));
                    }
                }
                let id = module.add_function(Function::new(raw.name.clone(), raw.params, raw.ret));
                funcs.insert(raw.name, id);
                if let Some(body) = raw.body {
                    bodies.push((id, body));
                }
            }
        }
    }

    for (id, body) in bodies {
        lower_body(&mut module, &funcs, id, body)?;
    }
    Ok(module)
}

fn lower_body(
    module: &mut Module,
    funcs: &FxHashMap<String, FuncId>,
    id: FuncId,
    body: Vec<RawBlock>,
) -> Result<(), ParseError> {
    let mut labels: FxHashMap<String, BlockId> = FxHashMap::default();
    let mut scope: FxHashMap<String, Value> = FxHashMap::default();

    for (i, p) in module[id].params.iter().enumerate() {
        scope.insert(p.name.clone(), Value::Param(index_u32(i)));
    }
    for raw in &body {
        let block = module[id].add_block(raw.label.clone());
        if labels.insert(raw.label.clone(), block).is_some() {
            return err(raw.line, format!("duplicate block label `{}`", raw.label));
        }
    }

    let resolve = |module: &Module, scope: &FxHashMap<String, Value>, v: RawValue, line: usize| {
        match v {
            RawValue::Const(c) => Ok(Value::Const(c)),
            RawValue::Local(n) => match scope.get(&n) {
                Some(&value) => Ok(value),
                None => err(line, format!("use of undefined value `%{n}`")),
            },
            RawValue::Symbol(s) => match module.global_by_name(&s) {
                Some(g) => Ok(Value::Global(g)),
                None => err(line, format!("unknown global `@{s}`")),
            },
        }
    };
    let target = |label: &str, line: usize| match labels.get(label) {
        Some(&b) => Ok(b),
        None => err(line, format!("unknown block `{label}`")),
    };

    for (block_idx, raw_block) in body.into_iter().enumerate() {
        let block = BlockId::new(index_u32(block_idx));
        for raw in raw_block.instrs {
            let line = raw.line;
            let instr = match raw.op {
                RawOp::Alloca(count) => Instr::new(
                    Type::Ptr,
                    InstrKind::Alloca {
                        count: resolve(&*module, &scope, count, line)?,
                    },
                ),
                RawOp::PtrAdd(base, indices) => {
                    let base = resolve(&*module, &scope, base, line)?;
                    let indices = indices
                        .into_iter()
                        .map(|v| resolve(&*module, &scope, v, line))
                        .collect::<Result<_, _>>()?;
                    Instr::new(Type::Ptr, InstrKind::PtrAdd { base, indices })
                }
                RawOp::Binary(op, lhs, rhs) => Instr::new(
                    Type::Int,
                    InstrKind::Binary {
                        op,
                        lhs: resolve(&*module, &scope, lhs, line)?,
                        rhs: resolve(&*module, &scope, rhs, line)?,
                    },
                ),
                RawOp::Load(ty, ptr) => {
                    if ty == Type::Void {
                        return err(line, "cannot load a `void` value");
                    }
                    Instr::new(
                        ty,
                        InstrKind::Load {
                            ptr: resolve(&*module, &scope, ptr, line)?,
                        },
                    )
                }
                RawOp::Store { value, ptr } => Instr::new(
                    Type::Void,
                    InstrKind::Store {
                        ptr: resolve(&*module, &scope, ptr, line)?,
                        value: resolve(&*module, &scope, value, line)?,
                    },
                ),
                RawOp::Call(ty, callee_name, args) => {
                    let Some(&callee) = funcs.get(&callee_name) else {
                        return err(line, format!("call to unknown function `@{callee_name}`"));
                    };
                    if module[callee].return_type != ty {
                        return err(
                            line,
                            format!(
                                "call declares `{}` but `@{callee_name}` returns `{}`",
                                ty.keyword(),
                                module[callee].return_type.keyword()
                            ),
                        );
                    }
                    let args = args
                        .into_iter()
                        .map(|v| resolve(&*module, &scope, v, line))
                        .collect::<Result<_, _>>()?;
                    Instr::new(ty, InstrKind::Call { callee, args })
                }
            };

            if instr.ty == Type::Void && raw.dst.is_some() {
                return err(line, "instruction produces no value but has a destination");
            }
            let instr = match &raw.dst {
                Some((name, true)) => instr.named(name.clone()),
                _ => instr,
            };
            let value = Value::Instr(module[id].append_instr(block, instr));
            if let Some((name, _)) = raw.dst {
                if scope.insert(name.clone(), value).is_some() {
                    return err(line, format!("value `%{name}` is defined twice"));
                }
            }
        }

        let line = raw_block.line;
        let terminator = match raw_block.term {
            RawTerm::Ret(value) => Terminator::Return {
                value: value
                    .map(|v| resolve(&*module, &scope, v, line))
                    .transpose()?,
            },
            RawTerm::Br(label) => Terminator::Jump {
                target: target(&label, line)?,
            },
            RawTerm::CondBr(cond, then_label, else_label) => Terminator::Branch {
                cond: resolve(&*module, &scope, cond, line)?,
                then_block: target(&then_label, line)?,
                else_block: target(&else_label, line)?,
            },
            RawTerm::Unreachable => Terminator::Unreachable,
        };
        module[id].set_terminator(block, terminator);
    }
    Ok(())
}

fn index_u32(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}
