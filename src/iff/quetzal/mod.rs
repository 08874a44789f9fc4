//! [Quetzal](https://inform-fiction.org/zmachine/standards/quetzal/index.html)
//! saved-state container
use std::fmt;

use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
};

use self::{cmem::CMem, ifhd::IFhd, stks::Stks, umem::UMem};

use super::*;

pub mod cmem;
pub mod ifhd;
pub mod stks;
pub mod umem;

/// A saved machine state: story identity, dynamic memory, and call stack
pub struct Quetzal {
    ifhd: IFhd,
    umem: Option<UMem>,
    cmem: Option<CMem>,
    stks: Stks,
}

impl fmt::Display for Quetzal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.ifhd)?;
        if let Some(umem) = &self.umem {
            writeln!(f, "{}", umem)?;
        }
        if let Some(cmem) = &self.cmem {
            writeln!(f, "{}", cmem)?;
        }
        write!(f, "{}", self.stks)
    }
}

impl TryFrom<Vec<u8>> for Quetzal {
    type Error = RuntimeError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        if value.len() < 12 || !vec_to_id(&value, 0).eq("FORM") {
            return recoverable_error!(ErrorCode::Restore, "Not an IFF file");
        }

        let iff = IFF::from(&value);
        if iff.sub_form() != "IFZS" {
            return recoverable_error!(
                ErrorCode::Restore,
                "Expected sub form 'IFZS': '{}'",
                iff.sub_form()
            );
        }

        let mut ifhd = None;
        let mut umem = None;
        let mut cmem = None;
        let mut stks = None;
        for chunk in iff.chunks() {
            match chunk.id() {
                "IFhd" => ifhd = Some(IFhd::from(chunk)),
                "CMem" => cmem = Some(CMem::from(chunk)),
                "UMem" => umem = Some(UMem::from(chunk)),
                "Stks" => stks = Some(Stks::from(chunk)),
                id => debug!(target: "app::quetzal", "Ignoring chunk with id '{}'", id),
            }
        }

        let ifhd = match ifhd {
            Some(i) => i,
            None => {
                return recoverable_error!(ErrorCode::Restore, "Save state is missing IFhd chunk")
            }
        };
        let stks = match stks {
            Some(s) => s,
            None => {
                return recoverable_error!(ErrorCode::Restore, "Save state is missing Stks chunk")
            }
        };
        if cmem.is_none() && umem.is_none() {
            return recoverable_error!(
                ErrorCode::Restore,
                "Save state is missing memory (CMem or UMem) chunk"
            );
        }

        Ok(Quetzal::new(ifhd, umem, cmem, stks))
    }
}

impl From<&Quetzal> for Vec<u8> {
    fn from(value: &Quetzal) -> Self {
        let mut form = id_as_vec("FORM");

        let mut ifzs = id_as_vec("IFZS");
        ifzs.append(&mut Vec::from(value.ifhd()));
        if let Some(u) = value.umem() {
            ifzs.append(&mut Vec::from(u))
        }
        if let Some(c) = value.cmem() {
            ifzs.append(&mut Vec::from(c))
        }
        ifzs.append(&mut Vec::from(value.stks()));

        form.append(&mut usize_as_vec(ifzs.len(), 4));
        form.append(&mut ifzs);
        if form.len() % 2 == 1 {
            form.push(0);
        }

        form
    }
}

impl Quetzal {
    /// Constructor
    ///
    /// # Arguments
    /// * `ifhd` - IFhd chunk
    /// * `umem` - Optional UMem chunk
    /// * `cmem` - Optional CMem chunk
    /// * `stks` - Stks chunk
    pub fn new(ifhd: IFhd, umem: Option<UMem>, cmem: Option<CMem>, stks: Stks) -> Quetzal {
        Quetzal {
            ifhd,
            umem,
            cmem,
            stks,
        }
    }

    pub fn ifhd(&self) -> &IFhd {
        &self.ifhd
    }

    pub fn umem(&self) -> Option<&UMem> {
        self.umem.as_ref()
    }

    pub fn cmem(&self) -> Option<&CMem> {
        self.cmem.as_ref()
    }

    pub fn stks(&self) -> &Stks {
        &self.stks
    }
}
