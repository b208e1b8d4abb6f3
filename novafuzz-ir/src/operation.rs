use std::fmt;

/// Binary arithmetic/logic operators used by [`Operation::BinaryOperation`].
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    LogicAnd,
    LogicOr,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::LShift => "<<",
            BinaryOperator::RShift => ">>",
            BinaryOperator::LogicAnd => "&&",
            BinaryOperator::LogicOr => "||",
        };
        write!(f, "{s}")
    }
}

/// Unary operators used by [`Operation::UnaryOperation`].
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
    BitNot,
    Inc,
    Dec,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
            UnaryOperator::Inc => "++",
            UnaryOperator::Dec => "--",
        };
        write!(f, "{s}")
    }
}

/// Comparison operators used by [`Operation::Compare`].
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOperator::Equal => "==",
            CompareOperator::NotEqual => "!=",
            CompareOperator::StrictEqual => "===",
            CompareOperator::StrictNotEqual => "!==",
            CompareOperator::LessThan => "<",
            CompareOperator::LessThanOrEqual => "<=",
            CompareOperator::GreaterThan => ">",
            CompareOperator::GreaterThanOrEqual => ">=",
        };
        write!(f, "{s}")
    }
}

/// The context an instruction executes in. Used to validate `break`/`continue`
/// placement and to scope block-local variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Global,
    FunctionBody,
    LoopBody,
    TryBody,
    CatchBody,
    FinallyBody,
    WithBody,
    ClassBody,
    CodeStringBody,
    BlockBody,
}

/// A catalogue of dynamic-language IR operations.
///
/// This is a reduced stand-in for a real IR operation catalogue and lifter
/// (out of scope, see `spec.md` Non-goals): it carries exactly the operations
/// the minimizer pipeline's reducers (generic nopping, block removal,
/// simplification, loop normalisation, inlining, reassignment resolution,
/// variadic-arity reduction, deduplication) need to operate over.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Hash, PartialEq)]
pub enum Operation {
    /// No-op placeholder used during minimization. Preserves output arity so
    /// variable numbering stays contiguous when an instruction is replaced.
    Nop {
        outputs: usize,
        inner_outputs: usize,
    },

    // ---- literals / loads ----------------------------------------------
    LoadInteger(i64),
    LoadBigInt(i64),
    LoadFloat(u64), // bit pattern of an f64, so Hash/Eq stay well-defined
    LoadString(String),
    LoadBoolean(bool),
    LoadUndefined,
    LoadNull,
    LoadThis,
    LoadArguments,
    LoadRegExp {
        pattern: String,
        flags: String,
    },
    /// Load a named builtin (e.g. `Math`, `print`) from the global scope.
    LoadBuiltin(String),
    /// Load a named variable from an enclosing scope (used by
    /// `DeduplicatingReducer` to recognise repeated loads of the same name).
    LoadFromScope(String),

    // ---- object / array construction ------------------------------------
    CreateObject(Vec<String>),
    CreateArray(usize),
    CreateArrayWithSpread(Vec<bool>),
    CreateTemplateString(Vec<String>),

    // ---- property / element access --------------------------------------
    GetProperty {
        name: String,
        is_guarded: bool,
    },
    SetProperty {
        name: String,
    },
    DeleteProperty {
        name: String,
    },
    GetElement {
        index: i64,
        is_guarded: bool,
    },
    SetElement {
        index: i64,
    },
    GetComputedProperty {
        is_guarded: bool,
    },
    SetComputedProperty,
    DestructObject {
        properties: Vec<String>,
        has_rest_element: bool,
    },
    DestructArray {
        indices: Vec<u32>,
        has_rest_element: bool,
    },

    // ---- arithmetic / comparisons ----------------------------------------
    BinaryOperation(BinaryOperator),
    UnaryOperation(UnaryOperator),
    Compare(CompareOperator),
    Dup,
    /// `inputs = [dst, src]`; rewrites subsequent uses of `dst` to `src`
    /// (see `ReassignmentReducer`).
    Reassign,

    // ---- calls / construction ---------------------------------------------
    CallFunction {
        num_arguments: usize,
        is_guarded: bool,
    },
    CallFunctionWithSpread {
        spreads: Vec<bool>,
        is_guarded: bool,
    },
    CallMethod {
        name: String,
        num_arguments: usize,
        is_guarded: bool,
    },
    CallMethodWithSpread {
        name: String,
        spreads: Vec<bool>,
        is_guarded: bool,
    },
    Construct {
        num_arguments: usize,
    },
    ConstructWithSpread {
        spreads: Vec<bool>,
    },
    CallSuperConstructor {
        num_arguments: usize,
    },

    // ---- control flow (simple) -------------------------------------------
    Return,
    Throw,
    Break,
    Continue,

    // ---- block-structured control flow: if/else --------------------------
    BeginIf,
    EndIf,
    BeginElse,
    EndElse,

    // ---- loops -------------------------------------------------------------
    BeginWhileLoop,
    EndWhileLoop,
    BeginDoWhileLoop,
    EndDoWhileLoop,
    BeginForLoop,
    EndForLoop,
    BeginRepeatLoop {
        iterations: u64,
    },
    EndRepeatLoop,

    // ---- exceptions ---------------------------------------------------------
    BeginTry,
    EndTry,
    BeginCatch,
    EndCatch,
    BeginFinally,
    EndFinally,

    // ---- misc block constructs -----------------------------------------------
    BeginWith,
    EndWith,
    BeginClassDefinition {
        name: Option<String>,
    },
    EndClassDefinition,
    BeginBlockStatement,
    EndBlockStatement,
    BeginCodeString,
    EndCodeString,

    // ---- function definitions -------------------------------------------------
    BeginPlainFunction {
        parameters: usize,
        name: Option<String>,
        is_strict: bool,
    },
    EndPlainFunction,
    BeginGeneratorFunction {
        parameters: usize,
        name: Option<String>,
        is_strict: bool,
    },
    EndGeneratorFunction,
    BeginAsyncFunction {
        parameters: usize,
        name: Option<String>,
        is_strict: bool,
    },
    EndAsyncFunction,
    BeginArrowFunction {
        parameters: usize,
        is_strict: bool,
    },
    EndArrowFunction,
    BeginAsyncGeneratorFunction {
        parameters: usize,
        name: Option<String>,
        is_strict: bool,
    },
    EndAsyncGeneratorFunction,
}

impl Operation {
    /// Number of inputs this operation reads.
    pub fn num_inputs(&self) -> usize {
        match self {
            Operation::Nop { .. }
            | Operation::LoadInteger(_)
            | Operation::LoadBigInt(_)
            | Operation::LoadFloat(_)
            | Operation::LoadString(_)
            | Operation::LoadBoolean(_)
            | Operation::LoadUndefined
            | Operation::LoadNull
            | Operation::LoadThis
            | Operation::LoadArguments
            | Operation::LoadRegExp { .. }
            | Operation::LoadBuiltin(_)
            | Operation::LoadFromScope(_)
            | Operation::Break
            | Operation::Continue
            | Operation::BeginIf
            | Operation::EndIf
            | Operation::BeginElse
            | Operation::EndElse
            | Operation::BeginWhileLoop
            | Operation::EndWhileLoop
            | Operation::BeginDoWhileLoop
            | Operation::EndDoWhileLoop
            | Operation::BeginForLoop
            | Operation::EndForLoop
            | Operation::BeginRepeatLoop { .. }
            | Operation::EndRepeatLoop
            | Operation::BeginTry
            | Operation::EndTry
            | Operation::BeginCatch
            | Operation::EndCatch
            | Operation::BeginFinally
            | Operation::EndFinally
            | Operation::BeginClassDefinition { .. }
            | Operation::EndClassDefinition
            | Operation::BeginBlockStatement
            | Operation::EndBlockStatement
            | Operation::BeginCodeString
            | Operation::BeginPlainFunction { .. }
            | Operation::EndPlainFunction
            | Operation::BeginGeneratorFunction { .. }
            | Operation::EndGeneratorFunction
            | Operation::BeginAsyncFunction { .. }
            | Operation::EndAsyncFunction
            | Operation::BeginArrowFunction { .. }
            | Operation::EndArrowFunction
            | Operation::BeginAsyncGeneratorFunction { .. }
            | Operation::EndAsyncGeneratorFunction
            | Operation::EndWith => 0,

            Operation::EndCodeString
            | Operation::CreateObject(_)
            | Operation::GetProperty { .. }
            | Operation::DeleteProperty { .. }
            | Operation::GetElement { .. }
            | Operation::DestructObject { .. }
            | Operation::DestructArray { .. }
            | Operation::UnaryOperation(_)
            | Operation::Dup
            | Operation::Return
            | Operation::Throw
            | Operation::BeginWith => 1,

            Operation::CreateArray(n) => *n,
            Operation::CreateArrayWithSpread(spreads) => spreads.len(),
            Operation::CreateTemplateString(parts) => parts.len().saturating_sub(1),

            Operation::SetProperty { .. } | Operation::SetElement { .. } => 2,
            Operation::GetComputedProperty { .. } | Operation::BinaryOperation(_) => 2,
            Operation::SetComputedProperty => 3,
            Operation::Compare(_) | Operation::Reassign => 2,

            Operation::CallFunction { num_arguments, .. } => 1 + num_arguments,
            Operation::CallFunctionWithSpread { spreads, .. } => 1 + spreads.len(),
            Operation::CallMethod { num_arguments, .. } => 1 + num_arguments,
            Operation::CallMethodWithSpread { spreads, .. } => 1 + spreads.len(),
            Operation::Construct { num_arguments } => 1 + num_arguments,
            Operation::ConstructWithSpread { spreads } => 1 + spreads.len(),
            Operation::CallSuperConstructor { num_arguments } => *num_arguments,
        }
    }

    /// Number of "normal" outputs this operation produces (visible outside
    /// any block it begins).
    pub fn num_outputs(&self) -> usize {
        match self {
            Operation::Nop {
                outputs,
                inner_outputs: _,
            } => *outputs,

            Operation::LoadInteger(_)
            | Operation::LoadBigInt(_)
            | Operation::LoadFloat(_)
            | Operation::LoadString(_)
            | Operation::LoadBoolean(_)
            | Operation::LoadUndefined
            | Operation::LoadNull
            | Operation::LoadThis
            | Operation::LoadArguments
            | Operation::LoadRegExp { .. }
            | Operation::LoadBuiltin(_)
            | Operation::LoadFromScope(_)
            | Operation::CreateObject(_)
            | Operation::CreateArray(_)
            | Operation::CreateArrayWithSpread(_)
            | Operation::CreateTemplateString(_)
            | Operation::GetProperty { .. }
            | Operation::DeleteProperty { .. }
            | Operation::GetElement { .. }
            | Operation::GetComputedProperty { .. }
            | Operation::BinaryOperation(_)
            | Operation::UnaryOperation(_)
            | Operation::Compare(_)
            | Operation::Dup
            | Operation::CallFunction { .. }
            | Operation::CallFunctionWithSpread { .. }
            | Operation::CallMethod { .. }
            | Operation::CallMethodWithSpread { .. }
            | Operation::Construct { .. }
            | Operation::ConstructWithSpread { .. }
            | Operation::CallSuperConstructor { .. }
            | Operation::EndCodeString
            | Operation::BeginCodeString => 1,

            Operation::DestructObject {
                properties,
                has_rest_element,
            } => properties.len() + usize::from(*has_rest_element),
            Operation::DestructArray {
                indices,
                has_rest_element,
            } => indices.len() + usize::from(*has_rest_element),

            Operation::BeginPlainFunction { .. }
            | Operation::BeginGeneratorFunction { .. }
            | Operation::BeginAsyncFunction { .. }
            | Operation::BeginArrowFunction { .. }
            | Operation::BeginAsyncGeneratorFunction { .. } => 1,

            Operation::SetProperty { .. }
            | Operation::SetElement { .. }
            | Operation::SetComputedProperty
            | Operation::Reassign
            | Operation::Return
            | Operation::Throw
            | Operation::Break
            | Operation::Continue
            | Operation::BeginIf
            | Operation::EndIf
            | Operation::BeginElse
            | Operation::EndElse
            | Operation::BeginWhileLoop
            | Operation::EndWhileLoop
            | Operation::BeginDoWhileLoop
            | Operation::EndDoWhileLoop
            | Operation::BeginForLoop
            | Operation::EndForLoop
            | Operation::BeginRepeatLoop { .. }
            | Operation::EndRepeatLoop
            | Operation::BeginTry
            | Operation::EndTry
            | Operation::BeginCatch
            | Operation::EndCatch
            | Operation::BeginFinally
            | Operation::EndFinally
            | Operation::BeginWith
            | Operation::EndWith
            | Operation::BeginClassDefinition { .. }
            | Operation::EndClassDefinition
            | Operation::BeginBlockStatement
            | Operation::EndBlockStatement
            | Operation::EndPlainFunction
            | Operation::EndGeneratorFunction
            | Operation::EndAsyncFunction
            | Operation::EndArrowFunction
            | Operation::EndAsyncGeneratorFunction => 0,
        }
    }

    /// Number of scope-local outputs this operation produces, visible only
    /// inside the block it begins (e.g. function parameters, the loop
    /// counter, the caught exception).
    pub fn num_inner_outputs(&self) -> usize {
        match self {
            Operation::Nop {
                outputs: _,
                inner_outputs,
            } => *inner_outputs,

            Operation::BeginForLoop | Operation::BeginRepeatLoop { .. } => 1,
            Operation::BeginCatch => 1,
            Operation::BeginPlainFunction { parameters, .. }
            | Operation::BeginGeneratorFunction { parameters, .. }
            | Operation::BeginAsyncFunction { parameters, .. }
            | Operation::BeginArrowFunction { parameters, .. }
            | Operation::BeginAsyncGeneratorFunction { parameters, .. } => *parameters,

            _ => 0,
        }
    }

    /// Whether this instruction opens a new block scope.
    pub fn is_block_begin(&self) -> bool {
        matches!(
            self,
            Operation::BeginIf
                | Operation::BeginElse
                | Operation::BeginWhileLoop
                | Operation::BeginDoWhileLoop
                | Operation::BeginForLoop
                | Operation::BeginRepeatLoop { .. }
                | Operation::BeginTry
                | Operation::BeginCatch
                | Operation::BeginFinally
                | Operation::BeginWith
                | Operation::BeginClassDefinition { .. }
                | Operation::BeginBlockStatement
                | Operation::BeginCodeString
                | Operation::BeginPlainFunction { .. }
                | Operation::BeginGeneratorFunction { .. }
                | Operation::BeginAsyncFunction { .. }
                | Operation::BeginArrowFunction { .. }
                | Operation::BeginAsyncGeneratorFunction { .. }
        )
    }

    /// Whether this instruction closes the block scope opened by a matching
    /// begin instruction.
    pub fn is_block_end(&self) -> bool {
        matches!(
            self,
            Operation::EndIf
                | Operation::EndElse
                | Operation::EndWhileLoop
                | Operation::EndDoWhileLoop
                | Operation::EndForLoop
                | Operation::EndRepeatLoop
                | Operation::EndTry
                | Operation::EndCatch
                | Operation::EndFinally
                | Operation::EndWith
                | Operation::EndClassDefinition
                | Operation::EndBlockStatement
                | Operation::EndCodeString
                | Operation::EndPlainFunction
                | Operation::EndGeneratorFunction
                | Operation::EndAsyncFunction
                | Operation::EndArrowFunction
                | Operation::EndAsyncGeneratorFunction
        )
    }

    /// Whether `other` is the block-begin matching this block-end.
    pub fn is_matching_block_begin(&self, other: &Operation) -> bool {
        matches!(
            (other, self),
            (Operation::BeginIf, Operation::EndIf)
                | (Operation::BeginElse, Operation::EndElse)
                | (Operation::BeginWhileLoop, Operation::EndWhileLoop)
                | (Operation::BeginDoWhileLoop, Operation::EndDoWhileLoop)
                | (Operation::BeginForLoop, Operation::EndForLoop)
                | (Operation::BeginRepeatLoop { .. }, Operation::EndRepeatLoop)
                | (Operation::BeginTry, Operation::EndTry)
                | (Operation::BeginCatch, Operation::EndCatch)
                | (Operation::BeginFinally, Operation::EndFinally)
                | (Operation::BeginWith, Operation::EndWith)
                | (Operation::BeginClassDefinition { .. }, Operation::EndClassDefinition)
                | (Operation::BeginBlockStatement, Operation::EndBlockStatement)
                | (Operation::BeginCodeString, Operation::EndCodeString)
                | (Operation::BeginPlainFunction { .. }, Operation::EndPlainFunction)
                | (
                    Operation::BeginGeneratorFunction { .. },
                    Operation::EndGeneratorFunction
                )
                | (Operation::BeginAsyncFunction { .. }, Operation::EndAsyncFunction)
                | (Operation::BeginArrowFunction { .. }, Operation::EndArrowFunction)
                | (
                    Operation::BeginAsyncGeneratorFunction { .. },
                    Operation::EndAsyncGeneratorFunction
                )
        )
    }

    /// The context entered by this instruction if it is a block-begin.
    pub fn entered_context_after_execution(&self) -> Option<Context> {
        if !self.is_block_begin() {
            return None;
        }
        Some(match self {
            Operation::BeginIf | Operation::BeginElse => Context::BlockBody,
            Operation::BeginWhileLoop | Operation::BeginDoWhileLoop | Operation::BeginForLoop => {
                Context::LoopBody
            }
            Operation::BeginRepeatLoop { .. } => Context::LoopBody,
            Operation::BeginTry => Context::TryBody,
            Operation::BeginCatch => Context::CatchBody,
            Operation::BeginFinally => Context::FinallyBody,
            Operation::BeginWith => Context::WithBody,
            Operation::BeginClassDefinition { .. } => Context::ClassBody,
            Operation::BeginBlockStatement => Context::BlockBody,
            Operation::BeginCodeString => Context::CodeStringBody,
            Operation::BeginPlainFunction { .. }
            | Operation::BeginGeneratorFunction { .. }
            | Operation::BeginAsyncFunction { .. }
            | Operation::BeginArrowFunction { .. }
            | Operation::BeginAsyncGeneratorFunction { .. } => Context::FunctionBody,
            _ => unreachable!("every block begin enters a context"),
        })
    }

    /// Whether this instruction may be replaced by a `Nop` by the generic
    /// minimization reducer. Block markers, `Nop` itself and instructions
    /// whose removal could never be behaviour-preserving in isolation
    /// (the second/third markers of try/catch/finally) are excluded.
    pub fn is_noppable(&self) -> bool {
        !matches!(
            self,
            Operation::Nop { .. }
                | Operation::BeginIf
                | Operation::EndIf
                | Operation::BeginElse
                | Operation::EndElse
                | Operation::BeginWhileLoop
                | Operation::EndWhileLoop
                | Operation::BeginDoWhileLoop
                | Operation::EndDoWhileLoop
                | Operation::BeginForLoop
                | Operation::EndForLoop
                | Operation::BeginRepeatLoop { .. }
                | Operation::EndRepeatLoop
                | Operation::BeginTry
                | Operation::EndTry
                | Operation::BeginCatch
                | Operation::EndCatch
                | Operation::BeginFinally
                | Operation::EndFinally
                | Operation::BeginWith
                | Operation::EndWith
                | Operation::BeginClassDefinition { .. }
                | Operation::EndClassDefinition
                | Operation::BeginBlockStatement
                | Operation::EndBlockStatement
                | Operation::BeginCodeString
                | Operation::EndCodeString
                | Operation::BeginPlainFunction { .. }
                | Operation::EndPlainFunction
                | Operation::BeginGeneratorFunction { .. }
                | Operation::EndGeneratorFunction
                | Operation::BeginAsyncFunction { .. }
                | Operation::EndAsyncFunction
                | Operation::BeginArrowFunction { .. }
                | Operation::EndArrowFunction
                | Operation::BeginAsyncGeneratorFunction { .. }
                | Operation::EndAsyncGeneratorFunction
        )
    }

    /// Whether this operation takes a variable number of inputs, i.e. can be
    /// rebuilt with a smaller arity by [`VariadicInputReducer`](crate::Operation).
    pub fn is_variadic(&self) -> bool {
        matches!(
            self,
            Operation::CreateArray(_)
                | Operation::CreateArrayWithSpread(_)
                | Operation::CallFunction { .. }
                | Operation::CallFunctionWithSpread { .. }
                | Operation::CallMethod { .. }
                | Operation::CallMethodWithSpread { .. }
                | Operation::Construct { .. }
                | Operation::ConstructWithSpread { .. }
                | Operation::CallSuperConstructor { .. }
                | Operation::CreateTemplateString(_)
        )
    }

    /// The statically required minimum arity for a variadic operation (the
    /// callee/constructor itself, or zero elements).
    pub fn variadic_minimum_inputs(&self) -> usize {
        match self {
            Operation::CreateArray(_) | Operation::CreateArrayWithSpread(_) => 0,
            Operation::CreateTemplateString(_) => 0,
            Operation::CallFunction { .. }
            | Operation::CallFunctionWithSpread { .. }
            | Operation::CallMethod { .. }
            | Operation::CallMethodWithSpread { .. }
            | Operation::Construct { .. }
            | Operation::ConstructWithSpread { .. } => 1, // the callee/constructor
            Operation::CallSuperConstructor { .. } => 0,
            _ => 0,
        }
    }

    /// Rebuild this variadic operation with one fewer trailing input.
    /// Panics if `self` is not variadic or already at its minimum arity.
    pub fn with_one_fewer_input(&self) -> Operation {
        match self {
            Operation::CreateArray(n) => Operation::CreateArray(n - 1),
            Operation::CreateArrayWithSpread(spreads) => {
                let mut spreads = spreads.clone();
                spreads.pop();
                Operation::CreateArrayWithSpread(spreads)
            }
            Operation::CreateTemplateString(parts) => {
                let mut parts = parts.clone();
                parts.pop();
                Operation::CreateTemplateString(parts)
            }
            Operation::CallFunction {
                num_arguments,
                is_guarded,
            } => Operation::CallFunction {
                num_arguments: num_arguments - 1,
                is_guarded: *is_guarded,
            },
            Operation::CallFunctionWithSpread { spreads, is_guarded } => {
                let mut spreads = spreads.clone();
                spreads.pop();
                Operation::CallFunctionWithSpread {
                    spreads,
                    is_guarded: *is_guarded,
                }
            }
            Operation::CallMethod {
                name,
                num_arguments,
                is_guarded,
            } => Operation::CallMethod {
                name: name.clone(),
                num_arguments: num_arguments - 1,
                is_guarded: *is_guarded,
            },
            Operation::CallMethodWithSpread {
                name,
                spreads,
                is_guarded,
            } => {
                let mut spreads = spreads.clone();
                spreads.pop();
                Operation::CallMethodWithSpread {
                    name: name.clone(),
                    spreads,
                    is_guarded: *is_guarded,
                }
            }
            Operation::Construct { num_arguments } => Operation::Construct {
                num_arguments: num_arguments - 1,
            },
            Operation::ConstructWithSpread { spreads } => {
                let mut spreads = spreads.clone();
                spreads.pop();
                Operation::ConstructWithSpread { spreads }
            }
            Operation::CallSuperConstructor { num_arguments } => Operation::CallSuperConstructor {
                num_arguments: num_arguments - 1,
            },
            other => panic!("{other:?} is not variadic"),
        }
    }

    /// Whether this operation's guard flag (optional-chaining-style, e.g.
    /// `a?.b()`) can be disabled by [`SimplifyingReducer`](crate::Operation).
    pub fn is_guardable(&self) -> bool {
        matches!(
            self,
            Operation::GetProperty { .. }
                | Operation::GetElement { .. }
                | Operation::GetComputedProperty { .. }
                | Operation::CallFunction { .. }
                | Operation::CallFunctionWithSpread { .. }
                | Operation::CallMethod { .. }
                | Operation::CallMethodWithSpread { .. }
        )
    }

    /// Disable the guard flag on a guardable operation.
    pub fn unguarded(&self) -> Operation {
        match self {
            Operation::GetProperty { name, .. } => Operation::GetProperty {
                name: name.clone(),
                is_guarded: false,
            },
            Operation::GetElement { index, .. } => Operation::GetElement {
                index: *index,
                is_guarded: false,
            },
            Operation::GetComputedProperty { .. } => {
                Operation::GetComputedProperty { is_guarded: false }
            }
            Operation::CallFunction { num_arguments, .. } => Operation::CallFunction {
                num_arguments: *num_arguments,
                is_guarded: false,
            },
            Operation::CallFunctionWithSpread { spreads, .. } => Operation::CallFunctionWithSpread {
                spreads: spreads.clone(),
                is_guarded: false,
            },
            Operation::CallMethod {
                name, num_arguments, ..
            } => Operation::CallMethod {
                name: name.clone(),
                num_arguments: *num_arguments,
                is_guarded: false,
            },
            Operation::CallMethodWithSpread { name, spreads, .. } => {
                Operation::CallMethodWithSpread {
                    name: name.clone(),
                    spreads: spreads.clone(),
                    is_guarded: false,
                }
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Nop { .. } => write!(f, "Nop"),
            Operation::LoadInteger(v) => write!(f, "LoadInteger {v}"),
            Operation::LoadBigInt(v) => write!(f, "LoadBigInt {v}"),
            Operation::LoadFloat(bits) => write!(f, "LoadFloat {}", f64::from_bits(*bits)),
            Operation::LoadString(s) => write!(f, "LoadString {s:?}"),
            Operation::LoadBoolean(b) => write!(f, "LoadBoolean {b}"),
            Operation::LoadUndefined => write!(f, "LoadUndefined"),
            Operation::LoadNull => write!(f, "LoadNull"),
            Operation::LoadThis => write!(f, "LoadThis"),
            Operation::LoadArguments => write!(f, "LoadArguments"),
            Operation::LoadRegExp { pattern, flags } => write!(f, "LoadRegExp /{pattern}/{flags}"),
            Operation::LoadBuiltin(name) => write!(f, "LoadBuiltin {name}"),
            Operation::LoadFromScope(name) => write!(f, "LoadFromScope {name}"),
            Operation::CreateObject(props) => write!(f, "CreateObject {props:?}"),
            Operation::CreateArray(n) => write!(f, "CreateArray({n})"),
            Operation::CreateArrayWithSpread(s) => write!(f, "CreateArrayWithSpread({s:?})"),
            Operation::CreateTemplateString(parts) => write!(f, "CreateTemplateString({parts:?})"),
            Operation::GetProperty { name, is_guarded } => {
                write!(f, "GetProperty {name}{}", if *is_guarded { "?" } else { "" })
            }
            Operation::SetProperty { name } => write!(f, "SetProperty {name}"),
            Operation::DeleteProperty { name } => write!(f, "DeleteProperty {name}"),
            Operation::GetElement { index, is_guarded } => {
                write!(f, "GetElement {index}{}", if *is_guarded { "?" } else { "" })
            }
            Operation::SetElement { index } => write!(f, "SetElement {index}"),
            Operation::GetComputedProperty { is_guarded } => {
                write!(f, "GetComputedProperty{}", if *is_guarded { "?" } else { "" })
            }
            Operation::SetComputedProperty => write!(f, "SetComputedProperty"),
            Operation::DestructObject { properties, .. } => {
                write!(f, "DestructObject {properties:?}")
            }
            Operation::DestructArray { indices, .. } => write!(f, "DestructArray {indices:?}"),
            Operation::BinaryOperation(op) => write!(f, "BinaryOperation({op})"),
            Operation::UnaryOperation(op) => write!(f, "UnaryOperation({op})"),
            Operation::Compare(op) => write!(f, "Compare({op})"),
            Operation::Dup => write!(f, "Dup"),
            Operation::Reassign => write!(f, "Reassign"),
            Operation::CallFunction { .. } => write!(f, "CallFunction"),
            Operation::CallFunctionWithSpread { .. } => write!(f, "CallFunctionWithSpread"),
            Operation::CallMethod { name, .. } => write!(f, "CallMethod {name}"),
            Operation::CallMethodWithSpread { name, .. } => write!(f, "CallMethodWithSpread {name}"),
            Operation::Construct { .. } => write!(f, "Construct"),
            Operation::ConstructWithSpread { .. } => write!(f, "ConstructWithSpread"),
            Operation::CallSuperConstructor { .. } => write!(f, "CallSuperConstructor"),
            Operation::Return => write!(f, "Return"),
            Operation::Throw => write!(f, "Throw"),
            Operation::Break => write!(f, "Break"),
            Operation::Continue => write!(f, "Continue"),
            Operation::BeginIf => write!(f, "BeginIf"),
            Operation::EndIf => write!(f, "EndIf"),
            Operation::BeginElse => write!(f, "BeginElse"),
            Operation::EndElse => write!(f, "EndElse"),
            Operation::BeginWhileLoop => write!(f, "BeginWhileLoop"),
            Operation::EndWhileLoop => write!(f, "EndWhileLoop"),
            Operation::BeginDoWhileLoop => write!(f, "BeginDoWhileLoop"),
            Operation::EndDoWhileLoop => write!(f, "EndDoWhileLoop"),
            Operation::BeginForLoop => write!(f, "BeginForLoop"),
            Operation::EndForLoop => write!(f, "EndForLoop"),
            Operation::BeginRepeatLoop { iterations } => {
                write!(f, "BeginRepeatLoop {iterations}")
            }
            Operation::EndRepeatLoop => write!(f, "EndRepeatLoop"),
            Operation::BeginTry => write!(f, "BeginTry"),
            Operation::EndTry => write!(f, "EndTry"),
            Operation::BeginCatch => write!(f, "BeginCatch"),
            Operation::EndCatch => write!(f, "EndCatch"),
            Operation::BeginFinally => write!(f, "BeginFinally"),
            Operation::EndFinally => write!(f, "EndFinally"),
            Operation::BeginWith => write!(f, "BeginWith"),
            Operation::EndWith => write!(f, "EndWith"),
            Operation::BeginClassDefinition { name } => write!(f, "BeginClassDefinition {name:?}"),
            Operation::EndClassDefinition => write!(f, "EndClassDefinition"),
            Operation::BeginBlockStatement => write!(f, "BeginBlockStatement"),
            Operation::EndBlockStatement => write!(f, "EndBlockStatement"),
            Operation::BeginCodeString => write!(f, "BeginCodeString"),
            Operation::EndCodeString => write!(f, "EndCodeString"),
            Operation::BeginPlainFunction { name, .. } => {
                write!(f, "BeginPlainFunction {name:?}")
            }
            Operation::EndPlainFunction => write!(f, "EndPlainFunction"),
            Operation::BeginGeneratorFunction { name, .. } => {
                write!(f, "BeginGeneratorFunction {name:?}")
            }
            Operation::EndGeneratorFunction => write!(f, "EndGeneratorFunction"),
            Operation::BeginAsyncFunction { name, .. } => {
                write!(f, "BeginAsyncFunction {name:?}")
            }
            Operation::EndAsyncFunction => write!(f, "EndAsyncFunction"),
            Operation::BeginArrowFunction { .. } => write!(f, "BeginArrowFunction"),
            Operation::EndArrowFunction => write!(f, "EndArrowFunction"),
            Operation::BeginAsyncGeneratorFunction { name, .. } => {
                write!(f, "BeginAsyncGeneratorFunction {name:?}")
            }
            Operation::EndAsyncGeneratorFunction => write!(f, "EndAsyncGeneratorFunction"),
        }
    }
}
