use std::collections::BTreeMap;

use serde_json::Value;

use crate::describe::DescriptionScope;
use crate::error::BoxError;
use crate::file::LoadedFile;
use crate::flags::FlagScope;
use crate::path::Field;
use crate::resolve::ResolveInput;
use crate::walk::{Config, Fields};

pub fn file(path: &str, value: Value) -> LoadedFile {
    let table = match value {
        Value::Object(table) => table,
        other => panic!("fixture file must be a mapping, got {other}"),
    };
    LoadedFile {
        path: path.into(),
        table,
    }
}

pub fn input() -> ResolveInput {
    ResolveInput {
        app_name: "app".into(),
        naming_key: "config".into(),
        ..Default::default()
    }
}

// -- Basic nesting: plain, optional and scalar-optional fields ---------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
    pub v: String,
    pub sub: Sub,
    pub ptr: Option<Sub>,
    pub flag: Option<bool>,
}

impl Root {
    pub fn new() -> Self {
        Self {
            v: "default-v".into(),
            sub: Sub {
                sv: "default-sv".into(),
            },
            ptr: None,
            flag: None,
        }
    }
}

impl Config for Root {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf("v", &mut self.v)
            .nested("sub", &mut self.sub)
            .optional("ptr", &mut self.ptr)
            .leaf("flag", &mut self.flag);
    }

    fn describe_fields(&self, d: &mut DescriptionScope<'_>) {
        d.add("v", "root value");
    }

    fn add_flags(&self, flags: &mut FlagScope<'_>) {
        flags.add("v", "v", "the v value");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sub {
    pub sv: String,
}

impl Config for Sub {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf("sv", &mut self.sv);
    }

    fn describe_fields(&self, d: &mut DescriptionScope<'_>) {
        d.add("sv", "sub value");
    }

    fn add_flags(&self, flags: &mut FlagScope<'_>) {
        flags.add("sv", "sub-value", "set the sub value").short('s');
    }
}

// -- Inline composition -------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inner {
    pub shared: String,
}

impl Config for Inner {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf("shared", &mut self.shared);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outer {
    pub inner: Inner,
    pub own: String,
}

impl Config for Outer {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.nested(Field::new("inner").squash(), &mut self.inner)
            .leaf("own", &mut self.own);
    }
}

// -- Naming keys and collections ---------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Server {
    pub port: u16,
    pub token: String,
    pub routes: Vec<Inner>,
    /// Declares `port` a second time when set.
    pub clash: bool,
    pub clash_port: u16,
}

impl Config for Server {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.leaf(Field::new("port").rename_for("docs", "listen_port"), &mut self.port)
            .leaf(Field::new("token").skip_for("docs"), &mut self.token)
            .seq("routes", &mut self.routes);
        if self.clash {
            f.leaf("port", &mut self.clash_port);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fleet {
    pub servers: BTreeMap<String, Server>,
}

impl Config for Fleet {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.map("servers", &mut self.servers);
    }
}

// -- Finalize hooks -------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooked {
    pub log: Vec<String>,
    pub fail: bool,
    pub child: HookedChild,
    pub items: Vec<HookedInner>,
    pub maybe: Option<HookedInner>,
}

impl Config for Hooked {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.nested("child", &mut self.child)
            .seq("items", &mut self.items)
            .optional("maybe", &mut self.maybe);
    }

    fn post_load(&mut self) -> Result<(), BoxError> {
        if self.fail {
            return Err("root refused".into());
        }
        self.log.push("root".into());
        self.child.parent_finalized = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookedChild {
    pub log: Vec<String>,
    pub parent_finalized: bool,
}

impl Config for HookedChild {
    fn fields(&mut self, _f: &mut Fields<'_>) {}

    fn post_load(&mut self) -> Result<(), BoxError> {
        self.log
            .push(format!("child saw parent={}", self.parent_finalized));
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookedInner {
    pub calls: u32,
}

impl Config for HookedInner {
    fn fields(&mut self, _f: &mut Fields<'_>) {}

    fn post_load(&mut self) -> Result<(), BoxError> {
        self.calls += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookedOuter {
    pub calls: u32,
    pub inner: HookedInner,
}

impl Config for HookedOuter {
    fn fields(&mut self, f: &mut Fields<'_>) {
        f.nested(Field::new("inner").squash(), &mut self.inner);
    }

    fn post_load(&mut self) -> Result<(), BoxError> {
        self.calls += 1;
        Ok(())
    }
}
