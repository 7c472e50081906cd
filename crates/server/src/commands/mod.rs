//! Command registry: names, usage lines, and the dispatch enum.
//!
//! Held in an `IndexMap` so `/help` lists commands in a stable, curated
//! order rather than hash order.

pub mod draw;
pub mod undo;

use indexmap::IndexMap;

/// Which handler a command routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Who,
    Mark,
    Marks,
    ClearMarks,
    Cuboid,
    Replace,
    Sphere,
    Line,
    Fill2d,
    Fill3d,
    Copy,
    Cut,
    Paste,
    DrawImage,
    Cancel,
    Undo,
    UndoArea,
    UndoPlayer,
    UndoPlayerNot,
    Confirm,
    Deny,
}

pub struct CommandDef {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub kind: CommandKind,
}

pub struct CommandRegistry {
    commands: IndexMap<&'static str, CommandDef>,
}

impl CommandRegistry {
    pub fn get(&self, name: &str) -> Option<&CommandDef> {
        self.commands.get(name)
    }

    /// One `/help` line per command, in registry order.
    pub fn help_lines(&self) -> Vec<String> {
        self.commands
            .values()
            .map(|def| format!("{} -- {}", def.usage, def.help))
            .collect()
    }
}

pub fn registry() -> CommandRegistry {
    let defs = [
        CommandDef {
            name: "help",
            usage: "/help",
            help: "list all commands",
            kind: CommandKind::Help,
        },
        CommandDef {
            name: "who",
            usage: "/who",
            help: "list connected players",
            kind: CommandKind::Who,
        },
        CommandDef {
            name: "mark",
            usage: "/mark <x> <y> <z>",
            help: "place a selection mark",
            kind: CommandKind::Mark,
        },
        CommandDef {
            name: "marks",
            usage: "/marks",
            help: "list your selection marks",
            kind: CommandKind::Marks,
        },
        CommandDef {
            name: "clearmarks",
            usage: "/clearmarks",
            help: "discard your selection marks",
            kind: CommandKind::ClearMarks,
        },
        CommandDef {
            name: "cuboid",
            usage: "/cuboid <block>",
            help: "fill the box of your last 2 marks",
            kind: CommandKind::Cuboid,
        },
        CommandDef {
            name: "replace",
            usage: "/replace <from...> <to>",
            help: "replace blocks inside the box of your last 2 marks",
            kind: CommandKind::Replace,
        },
        CommandDef {
            name: "sphere",
            usage: "/sphere <block>",
            help: "ball centered on your 1st mark, radius to your 2nd",
            kind: CommandKind::Sphere,
        },
        CommandDef {
            name: "line",
            usage: "/line <block>",
            help: "line between your last 2 marks",
            kind: CommandKind::Line,
        },
        CommandDef {
            name: "fill2d",
            usage: "/fill2d <block>",
            help: "flood fill the layer of your last mark",
            kind: CommandKind::Fill2d,
        },
        CommandDef {
            name: "fill3d",
            usage: "/fill3d <block>",
            help: "flood fill in all directions from your last mark",
            kind: CommandKind::Fill3d,
        },
        CommandDef {
            name: "copy",
            usage: "/copy",
            help: "copy the box of your last 2 marks to your clipboard",
            kind: CommandKind::Copy,
        },
        CommandDef {
            name: "cut",
            usage: "/cut [block]",
            help: "copy the box, then fill it with air (or a block)",
            kind: CommandKind::Cut,
        },
        CommandDef {
            name: "paste",
            usage: "/paste",
            help: "paste your clipboard at your last mark",
            kind: CommandKind::Paste,
        },
        CommandDef {
            name: "drawimage",
            usage: "/drawimage <file>",
            help: "draw an image file onto the plane of your last 2 marks",
            kind: CommandKind::DrawImage,
        },
        CommandDef {
            name: "cancel",
            usage: "/cancel",
            help: "stop your running draw command",
            kind: CommandKind::Cancel,
        },
        CommandDef {
            name: "undo",
            usage: "/undo [n]",
            help: "revert your last n finished commands (default 1)",
            kind: CommandKind::Undo,
        },
        CommandDef {
            name: "undoarea",
            usage: "/undoarea <count|duration> <players|*>",
            help: "revert changes inside the box of your last 2 marks",
            kind: CommandKind::UndoArea,
        },
        CommandDef {
            name: "undoplayer",
            usage: "/undoplayer <count|duration> <players|*>",
            help: "revert changes anywhere in the world",
            kind: CommandKind::UndoPlayer,
        },
        CommandDef {
            name: "undoplayernot",
            usage: "/undoplayernot <count|duration> <players>",
            help: "revert changes by everyone except the named players",
            kind: CommandKind::UndoPlayerNot,
        },
        CommandDef {
            name: "ok",
            usage: "/ok",
            help: "confirm the pending bulk undo",
            kind: CommandKind::Confirm,
        },
        CommandDef {
            name: "nvm",
            usage: "/nvm",
            help: "discard the pending bulk undo",
            kind: CommandKind::Deny,
        },
    ];
    let mut commands = IndexMap::with_capacity(defs.len());
    for def in defs {
        commands.insert(def.name, def);
    }
    CommandRegistry { commands }
}
