use std::any::Any;
use std::io::{self, Write};

/// Audio and device side effects the session triggers at phase boundaries.
///
/// Every method is best-effort: the controller ignores errors, so an impl
/// that can't reach its device simply loses the cue. `as_any` exists so
/// tests can downcast recording doubles back out of the controller.
pub trait CueSink {
    fn inhale_cue(&mut self) -> io::Result<()>;
    fn exhale_cue(&mut self) -> io::Result<()>;
    fn ambient_start(&mut self) -> io::Result<()>;
    fn ambient_stop(&mut self) -> io::Result<()>;
    fn keep_awake(&mut self, on: bool) -> io::Result<()>;
    fn as_any(&self) -> &dyn Any;
}

/// Production cue sink: rings the terminal bell for breath cues.
///
/// There is no ambient loop or wake lock to drive in a terminal, so those
/// calls only flip internal flags. The bell is gated on `sfx_enabled`, the
/// ambient flag on `bgm_enabled`.
pub struct TerminalCues {
    sfx_enabled: bool,
    bgm_enabled: bool,
    ambient_playing: bool,
}

impl TerminalCues {
    pub fn new(sfx_enabled: bool, bgm_enabled: bool) -> Self {
        Self {
            sfx_enabled,
            bgm_enabled,
            ambient_playing: false,
        }
    }

    pub fn ambient_playing(&self) -> bool {
        self.ambient_playing
    }

    fn bell(&mut self) -> io::Result<()> {
        if !self.sfx_enabled {
            return Ok(());
        }
        let mut stdout = io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()
    }
}

impl CueSink for TerminalCues {
    fn inhale_cue(&mut self) -> io::Result<()> {
        self.bell()
    }

    fn exhale_cue(&mut self) -> io::Result<()> {
        self.bell()
    }

    fn ambient_start(&mut self) -> io::Result<()> {
        self.ambient_playing = self.bgm_enabled;
        Ok(())
    }

    fn ambient_stop(&mut self) -> io::Result<()> {
        self.ambient_playing = false;
        Ok(())
    }

    fn keep_awake(&mut self, _on: bool) -> io::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Silent sink, the default for a freshly built controller.
pub struct NullCues;

impl CueSink for NullCues {
    fn inhale_cue(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn exhale_cue(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn ambient_start(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn ambient_stop(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn keep_awake(&mut self, _on: bool) -> io::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Test double that remembers every call in order.
#[derive(Default)]
pub struct RecordingCues {
    pub calls: Vec<&'static str>,
}

impl CueSink for RecordingCues {
    fn inhale_cue(&mut self) -> io::Result<()> {
        self.calls.push("inhale");
        Ok(())
    }

    fn exhale_cue(&mut self) -> io::Result<()> {
        self.calls.push("exhale");
        Ok(())
    }

    fn ambient_start(&mut self) -> io::Result<()> {
        self.calls.push("ambient_start");
        Ok(())
    }

    fn ambient_stop(&mut self) -> io::Result<()> {
        self.calls.push("ambient_stop");
        Ok(())
    }

    fn keep_awake(&mut self, on: bool) -> io::Result<()> {
        self.calls
            .push(if on { "keep_awake_on" } else { "keep_awake_off" });
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Test double where every call fails, for exercising the controller's
/// fire-and-forget error handling.
pub struct FailingCues;

impl CueSink for FailingCues {
    fn inhale_cue(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no audio device"))
    }

    fn exhale_cue(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no audio device"))
    }

    fn ambient_start(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no audio device"))
    }

    fn ambient_stop(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "no audio device"))
    }

    fn keep_awake(&mut self, _on: bool) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "no wake lock"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
